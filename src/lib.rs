//! releasekit - development environment setup runner and changelog fragment tooling

pub mod changelog;
pub mod cli;
pub mod commands;
pub mod core;
pub mod execution;
pub mod shell;

// Re-export commonly used types
pub use changelog::{ChangelogSettings, FragmentMerger, MergeReport};
pub use commands::{Command, CommandContext, CommandFactory, CommandRegistry, FailurePolicy};
pub use crate::core::{ConditionEvaluator, Configuration, RunState, RunStatus};
pub use execution::{PrerequisitesLoader, Runner, RunnerEvent, Setup};
pub use shell::{MockShell, ShellCommand, ShellExecutor, ShellOutput, SystemShell};
