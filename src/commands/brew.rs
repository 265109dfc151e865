//! Homebrew bundle

use super::{Command, CommandContext};
use crate::core::error::CommandResult;
use tracing::info;

pub struct BrewCommand {
    ctx: CommandContext,
}

impl BrewCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx }
    }

    pub fn boxed(ctx: &CommandContext) -> Box<dyn Command> {
        Box::new(Self::new(ctx.clone()))
    }
}

impl Command for BrewCommand {
    fn name(&self) -> &str {
        "brew"
    }

    fn description(&self) -> String {
        "Install Homebrew dependencies".to_string()
    }

    fn can_execute(&self) -> bool {
        self.ctx.exists("Brewfile")
    }

    fn execute(&mut self) -> CommandResult {
        if !self.ctx.confirm("Proceed with brew bundle?") {
            info!("Skipping brew bundle");
            return Ok(());
        }
        info!("Ensuring brew dependencies");
        self.ctx.run(&self.ctx.command(["brew", "bundle"]))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{test_context, ConfirmPolicy};
    use crate::shell::MockShell;
    use std::path::Path;

    #[test]
    fn test_runs_bundle_when_confirmed() {
        let shell = MockShell::new();
        BrewCommand::new(test_context(Path::new("/app"), &shell))
            .execute()
            .unwrap();
        assert_eq!(shell.commands(), vec!["brew bundle"]);
    }

    #[test]
    fn test_declined() {
        let shell = MockShell::new();
        let ctx = test_context(Path::new("/app"), &shell).with_confirm(ConfirmPolicy::AssumeNo);
        BrewCommand::new(ctx).execute().unwrap();
        assert!(shell.calls().is_empty());
    }
}
