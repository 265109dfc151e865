//! Core domain models for the setup runner
//!
//! Configuration, the condition language, run state, error types and the
//! environment seam shared by commands and the runner.

pub mod condition;
pub mod config;
pub mod env;
pub mod error;
pub mod state;

pub use condition::ConditionEvaluator;
pub use config::Configuration;
pub use env::{EnvStore, MemoryEnv, ProcessEnv};
pub use error::{CommandError, ConditionError, RunnerError};
pub use state::*;
