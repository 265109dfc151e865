//! Resolves configured step names into command instances

use super::custom::CustomCommand;
use super::registry::{self, CommandRegistry};
use super::{Command, CommandContext};
use crate::core::condition::ConditionEvaluator;
use tracing::{debug, warn};

/// Builds the command list for a run
#[derive(Debug, Clone)]
pub struct CommandFactory {
    registry: CommandRegistry,
    ctx: CommandContext,
}

impl CommandFactory {
    pub fn new(registry: CommandRegistry, ctx: CommandContext) -> Self {
        Self { registry, ctx }
    }

    /// Factory over a snapshot of the process-wide registry
    pub fn from_global(ctx: CommandContext) -> Self {
        Self::new(registry::snapshot(), ctx)
    }

    pub fn context(&self) -> &CommandContext {
        &self.ctx
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Instantiate the command registered as `name`, or `None` with a warning
    pub fn create_command(&self, name: &str) -> Option<Box<dyn Command>> {
        match self.registry.get(name) {
            Some(constructor) => {
                debug!("Creating command {}", name);
                Some(constructor(&self.ctx))
            }
            None => {
                warn!("Unknown setup step '{}', skipping", name);
                None
            }
        }
    }

    /// Explicit steps in declared order (or every registered command), then custom steps
    pub fn create_all_commands(&self) -> Vec<Box<dyn Command>> {
        let config = &self.ctx.config;
        let mut commands: Vec<Box<dyn Command>> = if config.steps.is_empty() {
            self.registry
                .iter()
                .map(|(_, constructor)| constructor(&self.ctx))
                .collect()
        } else {
            config
                .steps
                .iter()
                .filter_map(|name| self.create_command(name))
                .collect()
        };

        let evaluator = ConditionEvaluator::new()
            .with_base_dir(&self.ctx.app_root)
            .with_env_store(self.ctx.env.clone());
        for step in &config.custom_steps {
            commands.push(Box::new(CustomCommand::new(
                self.ctx.clone(),
                step.clone(),
                evaluator.clone(),
            )));
        }

        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandConstructor;
    use crate::core::config::{Configuration, CustomStepConfig};
    use crate::core::error::CommandResult;
    use crate::shell::MockShell;
    use std::sync::Arc;

    struct Named(&'static str);

    impl Command for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn execute(&mut self) -> CommandResult {
            Ok(())
        }
    }

    fn a(_: &CommandContext) -> Box<dyn Command> {
        Box::new(Named("a"))
    }

    fn b(_: &CommandContext) -> Box<dyn Command> {
        Box::new(Named("b"))
    }

    fn c(_: &CommandContext) -> Box<dyn Command> {
        Box::new(Named("c"))
    }

    fn factory(config: Configuration) -> CommandFactory {
        let registry = CommandRegistry::from_entries([
            ("a", a as CommandConstructor),
            ("b", b as CommandConstructor),
            ("c", c as CommandConstructor),
        ]);
        let ctx = CommandContext::new(Arc::new(config), "/app", Arc::new(MockShell::new()));
        CommandFactory::new(registry, ctx)
    }

    fn names(commands: &[Box<dyn Command>]) -> Vec<String> {
        commands.iter().map(|cmd| cmd.name().to_string()).collect()
    }

    #[test]
    fn test_explicit_step_order() {
        let config = Configuration {
            steps: vec!["b".to_string(), "a".to_string()],
            ..Configuration::default()
        };
        assert_eq!(names(&factory(config).create_all_commands()), vec!["b", "a"]);
    }

    #[test]
    fn test_all_registered_when_no_steps() {
        let commands = factory(Configuration::default()).create_all_commands();
        assert_eq!(names(&commands), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unknown_steps_are_skipped() {
        let config = Configuration {
            steps: vec!["nonexistent".to_string()],
            ..Configuration::default()
        };
        assert!(factory(config).create_all_commands().is_empty());

        let config = Configuration {
            steps: vec!["c".to_string(), "nope".to_string(), "a".to_string()],
            ..Configuration::default()
        };
        assert_eq!(names(&factory(config).create_all_commands()), vec!["c", "a"]);
    }

    #[test]
    fn test_custom_steps_are_always_appended() {
        let config = Configuration {
            steps: vec!["a".to_string()],
            custom_steps: vec![
                CustomStepConfig::new("echo one").with_description("First"),
                CustomStepConfig::new("echo two"),
            ],
            ..Configuration::default()
        };
        let commands = factory(config).create_all_commands();
        assert_eq!(names(&commands), vec!["a", "custom", "custom"]);
        assert_eq!(commands[1].description(), "First");
        assert_eq!(commands[2].description(), "Custom command: echo two");
    }

    #[test]
    fn test_create_command() {
        let factory = factory(Configuration::default());
        assert_eq!(factory.create_command("b").unwrap().name(), "b");
        assert!(factory.create_command("missing").is_none());
    }
}
