//! Error types shared by the setup pipeline

use thiserror::Error;

/// Errors raised while parsing or evaluating a condition expression.
///
/// These never escape [`ConditionEvaluator::evaluate`](crate::core::condition::ConditionEvaluator::evaluate);
/// they are logged and turned into `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("Parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("Unsafe node: {0}")]
    UnsafeNode(String),

    #[error("Unsafe method call: {0}")]
    UnsafeCall(String),

    #[error("Unsafe backtick command: {0}")]
    ShellEscape(String),
}

/// Errors raised by a single setup command
#[derive(Debug, Error)]
pub enum CommandError {
    /// An external command exited unsuccessfully
    #[error("`{command}` failed: {output}")]
    Shell { command: String, output: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("{0}")]
    Failed(String),
}

/// Errors raised by the runner
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{description} failed: {message}")]
    CommandFailed { description: String, message: String },

    #[error("Runner has already been run")]
    AlreadyRun,
}

pub type CommandResult<T = ()> = Result<T, CommandError>;
pub type RunnerResult<T = ()> = Result<T, RunnerError>;
