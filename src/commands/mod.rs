//! Setup commands
//!
//! A [`Command`] is one named provisioning action. Built-in commands are
//! registered in [`registry`] under stable names and materialized by
//! [`factory::CommandFactory`]; operator-declared shell commands become
//! [`custom::CustomCommand`]s.

pub mod asdf;
pub mod brew;
pub mod bundler;
pub mod config_files;
pub mod custom;
pub mod database;
pub mod docker;
pub mod env;
pub mod factory;
pub mod git;
pub mod pg_tools;
pub mod registry;
pub mod yarn;

pub use factory::CommandFactory;
pub use registry::{CommandConstructor, CommandRegistry, Registry};

use crate::core::config::Configuration;
use crate::core::env::{EnvStore, ProcessEnv};
use crate::core::error::{CommandError, CommandResult};
use crate::shell::{ShellCommand, ShellExecutor, ShellOutput};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A single provisioning step in the setup pipeline
pub trait Command {
    /// Stable name used for registry lookups and runner mutations
    fn name(&self) -> &str;

    /// Human-readable description for logs
    fn description(&self) -> String {
        humanize(self.name())
    }

    /// Whether this command applies to the current repository
    fn can_execute(&self) -> bool {
        true
    }

    fn execute(&mut self) -> CommandResult;

    /// What the runner does when [`Command::execute`] fails
    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Fatal
    }
}

/// How a failure is treated, either for a whole command or a single shell call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run
    Fatal,
    /// Log a warning and carry on
    Tolerate,
}

/// Answer to interactive "install X?" questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmPolicy {
    /// Prompt on the terminal; answers "no" in CI or without a terminal
    #[default]
    Ask,
    AssumeYes,
    AssumeNo,
}

/// Host operating system, as far as install commands care
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }
}

/// Everything a command needs: configuration, where the app lives and how to run things
#[derive(Clone)]
pub struct CommandContext {
    pub config: Arc<Configuration>,
    pub app_root: PathBuf,
    pub shell: Arc<dyn ShellExecutor>,
    pub env: Arc<dyn EnvStore>,
    pub confirm: ConfirmPolicy,
    pub platform: Platform,
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("app_name", &self.config.app_name)
            .field("app_root", &self.app_root)
            .field("confirm", &self.confirm)
            .field("platform", &self.platform)
            .finish()
    }
}

impl CommandContext {
    pub fn new(
        config: Arc<Configuration>,
        app_root: impl Into<PathBuf>,
        shell: Arc<dyn ShellExecutor>,
    ) -> Self {
        Self {
            config,
            app_root: app_root.into(),
            shell,
            env: Arc::new(ProcessEnv),
            confirm: ConfirmPolicy::default(),
            platform: Platform::current(),
        }
    }

    pub fn with_env(mut self, env: Arc<dyn EnvStore>) -> Self {
        self.env = env;
        self
    }

    pub fn with_confirm(mut self, confirm: ConfirmPolicy) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Path relative to the app root
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.app_root.join(relative)
    }

    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.path(relative).exists()
    }

    /// Command from argv, run in the app root
    pub fn command<I, S>(&self, argv: I) -> ShellCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ShellCommand::new(argv).current_dir(&self.app_root)
    }

    /// `sh -c` script, run in the app root
    pub fn script(&self, script: impl Into<String>) -> ShellCommand {
        ShellCommand::shell(script).current_dir(&self.app_root)
    }

    /// Run a command; a failure is an error under `Fatal` and a warning under `Tolerate`
    pub fn system(&self, command: &ShellCommand, policy: FailurePolicy) -> CommandResult<ShellOutput> {
        info!("Running: {}", command);
        let output = self.shell.run(command);
        if output.success {
            let stdout = output.stdout.trim();
            if !stdout.is_empty() {
                debug!("{}", stdout);
            }
            return Ok(output);
        }

        match policy {
            FailurePolicy::Fatal => Err(CommandError::Shell {
                command: command.to_string(),
                output: output.diagnostic(),
            }),
            FailurePolicy::Tolerate => {
                warn!("`{}` failed (ignored): {}", command, output.diagnostic());
                Ok(output)
            }
        }
    }

    /// Run a command whose failure stops the command
    pub fn run(&self, command: &ShellCommand) -> CommandResult<ShellOutput> {
        self.system(command, FailurePolicy::Fatal)
    }

    /// Probe a command's exit status without logging its output
    pub fn succeeds(&self, command: &ShellCommand) -> bool {
        self.shell.run_quiet(command)
    }

    /// Ask a yes/no question according to the confirm policy
    pub fn confirm(&self, question: &str) -> bool {
        match self.confirm {
            ConfirmPolicy::AssumeYes => true,
            ConfirmPolicy::AssumeNo => false,
            ConfirmPolicy::Ask => {
                let term = console::Term::stdout();
                if std::env::var_os("CI").is_some() || !term.is_term() {
                    info!("{} (no terminal, answering no)", question);
                    return false;
                }
                if term.write_line(&format!("{} [y/N]", question)).is_err() {
                    return false;
                }
                term.read_line()
                    .map(|answer| matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
                    .unwrap_or(false)
            }
        }
    }
}

/// `pg_tools` -> `Pg tools`
pub fn humanize(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Copy `from` to `to` unless `to` already exists; returns whether a copy happened
pub(crate) fn copy_if_missing(from: &Path, to: &Path) -> CommandResult<bool> {
    if to.exists() || !from.exists() {
        return Ok(false);
    }
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(from, to)?;
    info!("Copied {} to {}", from.display(), to.display());
    Ok(true)
}

#[cfg(test)]
pub(crate) fn test_context(app_root: &Path, shell: &crate::shell::MockShell) -> CommandContext {
    CommandContext::new(
        Arc::new(Configuration::default()),
        app_root,
        Arc::new(shell.clone()),
    )
    .with_env(Arc::new(crate::core::env::MemoryEnv::new()))
    .with_confirm(ConfirmPolicy::AssumeYes)
    .with_platform(Platform::Linux)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::MockShell;
    use tempfile::TempDir;

    fn context(shell: MockShell) -> CommandContext {
        CommandContext::new(Arc::new(Configuration::default()), "/app", Arc::new(shell))
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("pg_tools"), "Pg tools");
        assert_eq!(humanize("env"), "Env");
        assert_eq!(humanize(""), "");
    }

    #[test]
    fn test_system_fatal_failure_carries_stderr() {
        let shell = MockShell::new();
        shell.fail("bin/rails db:migrate", "PG::ConnectionBad");
        let ctx = context(shell);

        let err = ctx
            .run(&ctx.command(["bin/rails", "db:migrate"]))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bin/rails db:migrate"));
        assert!(message.contains("PG::ConnectionBad"));
    }

    #[test]
    fn test_system_tolerated_failure_returns_output() {
        let shell = MockShell::new();
        shell.fail("log:clear", "nope");
        let ctx = context(shell);

        let output = ctx
            .system(&ctx.command(["bin/rails", "log:clear"]), FailurePolicy::Tolerate)
            .unwrap();
        assert!(!output.success);
    }

    #[test]
    fn test_commands_run_in_app_root() {
        let shell = MockShell::new();
        let ctx = context(shell.clone());
        ctx.run(&ctx.script("echo hi")).unwrap();
        assert_eq!(shell.calls()[0].cwd.as_deref(), Some(Path::new("/app")));
    }

    #[test]
    fn test_confirm_policies() {
        let ctx = context(MockShell::new());
        assert!(ctx.clone().with_confirm(ConfirmPolicy::AssumeYes).confirm("Install?"));
        assert!(!ctx.with_confirm(ConfirmPolicy::AssumeNo).confirm("Install?"));
    }

    #[test]
    fn test_copy_if_missing() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join(".env.example");
        let to = dir.path().join(".env");
        std::fs::write(&from, "A=1").unwrap();

        assert!(copy_if_missing(&from, &to).unwrap());
        std::fs::write(&to, "A=2").unwrap();
        assert!(!copy_if_missing(&from, &to).unwrap());
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "A=2");
    }
}
