//! Work that has to happen before the main pipeline
//!
//! Exports the database settings later commands read (`DB_PORT`, `PGPORT`,
//! `DB_NAME`) and runs the configured pre-steps. Values already present in
//! the environment win over the configuration.

use super::pre_steps::PreCommandRegistry;
use crate::commands::custom::CustomCommand;
use crate::commands::{Command, CommandContext};
use crate::core::condition::ConditionEvaluator;
use crate::core::config::{Configuration, CustomStepConfig, PreStepConfig};
use crate::core::env::EnvStore;
use crate::shell::ShellExecutor;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub struct PrerequisitesLoader {
    ctx: CommandContext,
    registry: PreCommandRegistry,
}

impl PrerequisitesLoader {
    pub fn new(ctx: CommandContext) -> Self {
        Self {
            ctx,
            registry: PreCommandRegistry::builtin(),
        }
    }

    pub fn with_registry(mut self, registry: PreCommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Load `config_path` and run; `Ok(false)` when there is no configuration file
    pub fn run_from_file(
        config_path: &Path,
        app_root: &Path,
        shell: Arc<dyn ShellExecutor>,
        env: Arc<dyn EnvStore>,
    ) -> Result<bool> {
        if !config_path.exists() {
            return Ok(false);
        }
        let config = Configuration::from_file(config_path)?;
        let ctx = CommandContext::new(Arc::new(config), app_root, shell).with_env(env);
        Self::new(ctx).run();
        Ok(true)
    }

    pub fn run(&self) {
        self.export_database_env();
        for step in &self.ctx.config.pre_steps {
            match step {
                PreStepConfig::Named(name) => self.run_named(name),
                PreStepConfig::Custom(step) => self.run_custom(step),
            }
        }
    }

    fn export_database_env(&self) {
        let env = &self.ctx.env;
        let database = &self.ctx.config.database;

        let port = database.port.to_string();
        match env.get("DB_PORT").filter(|value| !value.is_empty()) {
            None => {
                env.set("DB_PORT", &port);
                env.set("PGPORT", &port);
                info!("Setting DB_PORT={} from configuration", port);
            }
            Some(existing) => {
                warn_if_mismatch("DB_PORT", &existing, &port);
                env.set("PGPORT", &existing);
            }
        }

        let name = database.database_name();
        match env.get("DB_NAME").filter(|value| !value.is_empty()) {
            None => {
                env.set("DB_NAME", &name);
                info!(
                    "Setting DB_NAME={} from configuration (container: {})",
                    name, database.name
                );
            }
            Some(existing) => warn_if_mismatch("DB_NAME", &existing, &name),
        }
    }

    fn run_named(&self, name: &str) {
        let Some(constructor) = self.registry.get(name) else {
            warn!("Unknown pre-step: {}", name);
            return;
        };
        let mut command = constructor(&self.ctx);
        info!("{}...", command.description());
        if !command.execute() {
            warn!("Pre-step {} did not complete", name);
        }
    }

    fn run_custom(&self, step: &CustomStepConfig) {
        let evaluator = ConditionEvaluator::new()
            .with_base_dir(&self.ctx.app_root)
            .with_env_store(self.ctx.env.clone());
        let mut command = CustomCommand::new(self.ctx.clone(), step.clone(), evaluator);
        if let Err(err) = command.execute() {
            warn!("Pre-step {} failed: {}", command.description(), err);
        }
    }
}

fn warn_if_mismatch(key: &str, env_value: &str, config_value: &str) {
    if env_value != config_value {
        warn!(
            "{} environment variable ({}) differs from configuration ({}); using the environment value. Unset {} to use the configured one.",
            key, env_value, config_value, key
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_context;
    use crate::core::env::MemoryEnv;
    use crate::shell::MockShell;
    use tempfile::TempDir;

    fn loader(config: Configuration, env: &Arc<MemoryEnv>, shell: &MockShell) -> PrerequisitesLoader {
        let mut ctx = test_context(Path::new("/app"), shell).with_env(env.clone());
        ctx.config = Arc::new(config);
        PrerequisitesLoader::new(ctx)
    }

    #[test]
    fn test_exports_configured_database_settings() {
        let env = Arc::new(MemoryEnv::new());
        loader(Configuration::default(), &env, &MockShell::new()).run();

        let vars = env.snapshot();
        assert_eq!(vars["DB_PORT"], "5432");
        assert_eq!(vars["PGPORT"], "5432");
        assert_eq!(vars["DB_NAME"], "app");
    }

    #[test]
    fn test_environment_wins() {
        let env = Arc::new(MemoryEnv::with_vars([("DB_PORT", "5433"), ("DB_NAME", "legacy")]));
        loader(Configuration::default(), &env, &MockShell::new()).run();

        let vars = env.snapshot();
        assert_eq!(vars["DB_PORT"], "5433");
        assert_eq!(vars["PGPORT"], "5433");
        assert_eq!(vars["DB_NAME"], "legacy");
    }

    #[test]
    fn test_runs_pre_steps_in_order() {
        let config = Configuration::from_yaml(
            r#"
pre_steps:
  - homebrew
  - nonexistent
  - command: "echo ready"
    description: "Say ready"
  - command: "echo never"
    condition: "false"
"#,
        )
        .unwrap();
        let shell = MockShell::new();
        loader(config, &Arc::new(MemoryEnv::new()), &shell).run();

        assert_eq!(shell.commands(), vec!["which brew", "echo ready"]);
    }

    #[test]
    fn test_failing_custom_pre_step_is_not_fatal() {
        let config = Configuration {
            pre_steps: vec![
                PreStepConfig::Custom(CustomStepConfig::new("exit 1")),
                PreStepConfig::Custom(CustomStepConfig::new("echo after")),
            ],
            ..Configuration::default()
        };
        let shell = MockShell::new();
        shell.fail("exit 1", "");
        loader(config, &Arc::new(MemoryEnv::new()), &shell).run();
        assert!(shell.ran("echo after"));
    }

    #[test]
    fn test_run_from_file_without_config() {
        let dir = TempDir::new().unwrap();
        let ran = PrerequisitesLoader::run_from_file(
            &dir.path().join("config/setup.yml"),
            dir.path(),
            Arc::new(MockShell::new()),
            Arc::new(MemoryEnv::new()),
        )
        .unwrap();
        assert!(!ran);
    }

    #[test]
    fn test_run_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("setup.yml");
        std::fs::write(&path, "database:\n  port: 6543\n  name: db-shop\n").unwrap();
        let env = Arc::new(MemoryEnv::new());

        let ran = PrerequisitesLoader::run_from_file(&path, dir.path(), Arc::new(MockShell::new()), env.clone())
            .unwrap();
        assert!(ran);
        assert_eq!(env.get("DB_PORT").as_deref(), Some("6543"));
        assert_eq!(env.get("DB_NAME").as_deref(), Some("shop"));
    }
}
