//! Whole setup: prerequisites, then the command pipeline

use super::prerequisites::PrerequisitesLoader;
use super::runner::{EventHandler, Runner, RunnerEvent};
use crate::commands::{registry, CommandContext, CommandFactory, CommandRegistry, ConfirmPolicy};
use crate::core::config::Configuration;
use crate::core::env::{EnvStore, ProcessEnv};
use crate::core::state::RunState;
use crate::shell::{ShellExecutor, SystemShell};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub struct Setup {
    config_path: PathBuf,
    app_root: PathBuf,
    shell: Arc<dyn ShellExecutor>,
    env: Arc<dyn EnvStore>,
    confirm: ConfirmPolicy,
    registry: Option<CommandRegistry>,
    skipped: Vec<String>,
    event_handlers: Vec<EventHandler>,
}

impl Setup {
    /// `config_path` is resolved against `app_root` when relative
    pub fn new(config_path: impl Into<PathBuf>, app_root: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            app_root: app_root.into(),
            shell: Arc::new(SystemShell::new()),
            env: Arc::new(ProcessEnv),
            confirm: ConfirmPolicy::default(),
            registry: None,
            skipped: Vec::new(),
            event_handlers: Vec::new(),
        }
    }

    pub fn with_shell(mut self, shell: Arc<dyn ShellExecutor>) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_env(mut self, env: Arc<dyn EnvStore>) -> Self {
        self.env = env;
        self
    }

    pub fn with_confirm(mut self, confirm: ConfirmPolicy) -> Self {
        self.confirm = confirm;
        self
    }

    /// Use `registry` instead of the process-wide one
    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Leave the named steps out of the pipeline
    pub fn skip(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.skipped.extend(names);
        self
    }

    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(RunnerEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    pub fn config_path(&self) -> PathBuf {
        if self.config_path.is_absolute() {
            self.config_path.clone()
        } else {
            self.app_root.join(&self.config_path)
        }
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    pub fn load_config(&self) -> Result<Configuration> {
        Configuration::from_file(self.config_path())
    }

    pub fn context(&self, config: Configuration) -> CommandContext {
        CommandContext::new(Arc::new(config), &self.app_root, self.shell.clone())
            .with_env(self.env.clone())
            .with_confirm(self.confirm)
    }

    /// Runner over the configured pipeline, with this setup's event handlers attached
    pub fn runner(&self, ctx: CommandContext) -> Runner {
        let registry = self.registry.clone().unwrap_or_else(registry::snapshot);
        let mut runner = Runner::new(CommandFactory::new(registry, ctx));
        for name in &self.skipped {
            runner.remove_command(name);
        }
        for handler in &self.event_handlers {
            runner.add_shared_handler(handler.clone());
        }
        runner
    }

    pub fn run(&self) -> Result<RunState> {
        let config = self.load_config()?;
        info!("== Setting up {} ==", config.app_name);
        let ctx = self.context(config);

        PrerequisitesLoader::new(ctx.clone()).run();

        let mut runner = self.runner(ctx);
        runner.run().context("Setup failed")?;

        info!("Setup completed successfully!");
        Ok(runner.state().clone())
    }
}
