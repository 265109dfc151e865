//! Setup run state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall status of a setup run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Runner has not started
    NotStarted,
    /// Commands are executing
    Running,
    /// Every applicable command succeeded or was tolerated
    Completed,
    /// A fatal command failed; later commands were not run
    Failed,
}

/// Bookkeeping for a single setup run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run ID
    pub run_id: Uuid,

    pub status: RunStatus,

    pub started_at: Option<DateTime<Utc>>,

    pub completed_at: Option<DateTime<Utc>>,

    /// Number of commands in the pipeline when the run started
    pub total_commands: usize,

    /// Names of commands that executed successfully
    pub executed: Vec<String>,

    /// Names of commands skipped because they did not apply
    pub skipped: Vec<String>,

    /// Names of commands whose failure was tolerated
    pub warned: Vec<String>,

    /// Name of the command that halted the run
    pub failed: Option<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::NotStarted,
            started_at: None,
            completed_at: None,
            total_commands: 0,
            executed: Vec::new(),
            skipped: Vec::new(),
            warned: Vec::new(),
            failed: None,
        }
    }

    /// Mark run as started
    pub fn start(&mut self, total_commands: usize) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_commands = total_commands;
    }

    /// Mark run as completed
    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark run as failed on `command`
    pub fn fail(&mut self, command: &str) {
        self.status = RunStatus::Failed;
        self.failed = Some(command.to_string());
        self.completed_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, RunStatus::Completed | RunStatus::Failed)
    }

    /// Fraction of commands that have been dealt with (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_commands == 0 {
            return 0.0;
        }
        let handled = self.executed.len() + self.skipped.len() + self.warned.len();
        handled as f64 / self.total_commands as f64
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
