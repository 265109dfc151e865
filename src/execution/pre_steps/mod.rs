//! Environment bootstrap steps run before the main pipeline
//!
//! Pre-steps install the tools later commands rely on (Homebrew, the
//! PostgreSQL client). They share the [`Registry`] contract with commands
//! but live in their own namespace, and a failed pre-step is only a warning.

mod homebrew;
mod postgresql_tools;

pub use homebrew::HomebrewPreCommand;
pub use postgresql_tools::PostgresqlToolsPreCommand;

use crate::commands::{CommandContext, Registry};

pub trait PreCommand {
    fn name(&self) -> &str;

    fn description(&self) -> String;

    /// Returns whether the tool is available afterwards
    fn execute(&mut self) -> bool;
}

pub type PreCommandConstructor = fn(&CommandContext) -> Box<dyn PreCommand>;

pub type PreCommandRegistry = Registry<PreCommandConstructor>;

impl PreCommandRegistry {
    pub fn builtin() -> Self {
        Self::from_entries([
            ("homebrew", HomebrewPreCommand::boxed as PreCommandConstructor),
            ("postgresql_tools", PostgresqlToolsPreCommand::boxed as PreCommandConstructor),
        ])
    }
}
