//! Running the setup: prerequisites, pre-steps and the command pipeline

pub mod pre_steps;
pub mod prerequisites;
pub mod runner;
pub mod setup;

pub use pre_steps::{PreCommand, PreCommandRegistry};
pub use prerequisites::PrerequisitesLoader;
pub use runner::{EventHandler, Runner, RunnerEvent};
pub use setup::Setup;
