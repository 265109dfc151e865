//! Test utility functions for releasekit
#![allow(dead_code)]

use parking_lot::Mutex;
use releasekit::commands::{Command, CommandContext, CommandFactory, CommandRegistry, ConfirmPolicy, FailurePolicy, Platform};
use releasekit::core::config::Configuration;
use releasekit::core::env::MemoryEnv;
use releasekit::core::error::{CommandError, CommandResult};
use releasekit::execution::Runner;
use releasekit::shell::MockShell;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Shared record of which commands executed, in order
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

pub fn execution_log() -> ExecutionLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Command that records its execution instead of doing anything
pub struct RecordingCommand {
    name: String,
    description: Option<String>,
    log: ExecutionLog,
    applicable: bool,
    failure: Option<String>,
    policy: FailurePolicy,
}

impl RecordingCommand {
    pub fn new(name: &str, log: &ExecutionLog) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            log: log.clone(),
            applicable: true,
            failure: None,
            policy: FailurePolicy::Fatal,
        }
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn not_applicable(mut self) -> Self {
        self.applicable = false;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn tolerated(mut self) -> Self {
        self.policy = FailurePolicy::Tolerate;
        self
    }

    pub fn boxed(self) -> Box<dyn Command> {
        Box::new(self)
    }
}

impl Command for RecordingCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| releasekit::commands::humanize(&self.name))
    }

    fn can_execute(&self) -> bool {
        self.applicable
    }

    fn execute(&mut self) -> CommandResult {
        self.log.lock().push(self.name.clone());
        match &self.failure {
            Some(message) => Err(CommandError::Failed(message.clone())),
            None => Ok(()),
        }
    }

    fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }
}

/// Context over a mock shell and in-memory environment, answering yes to prompts
pub fn context(config: Configuration, app_root: &Path, shell: &MockShell) -> CommandContext {
    CommandContext::new(Arc::new(config), app_root, Arc::new(shell.clone()))
        .with_env(Arc::new(MemoryEnv::new()))
        .with_confirm(ConfirmPolicy::AssumeYes)
        .with_platform(Platform::Linux)
}

/// Runner with an empty registry, so only added commands run
pub fn empty_runner() -> Runner {
    let ctx = context(Configuration::default(), Path::new("/app"), &MockShell::new());
    Runner::new(CommandFactory::new(CommandRegistry::new(), ctx))
}

/// Temporary application checkout
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(self, relative: &str, content: &str) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(path, content).expect("write file");
        self
    }

    pub fn dir(self, relative: &str) -> Self {
        std::fs::create_dir_all(self.dir.path().join(relative)).expect("create dir");
        self
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(relative)).expect("read file")
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.dir.path().join(relative).exists()
    }
}
