//! CLI command definitions

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Run prerequisites and the full setup pipeline
#[derive(Debug, Args, Clone)]
pub struct SetupCommand {
    /// Leave a step out of this run (repeatable)
    #[arg(long, value_name = "STEP")]
    pub skip: Vec<String>,

    /// Environment overrides applied before the run (KEY=VALUE)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,
}

/// Run only the prerequisites phase
#[derive(Debug, Args, Clone)]
pub struct PrereqsCommand {}

/// Show the effective pipeline without running it
#[derive(Debug, Args, Clone)]
pub struct StepsCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate the setup configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Print the resolved configuration as JSON
    #[arg(long)]
    pub json: bool,
}

/// Changelog fragment tasks
#[derive(Debug, Args, Clone)]
pub struct ChangelogCommand {
    #[command(subcommand)]
    pub action: ChangelogAction,
}

#[derive(Debug, Subcommand, Clone)]
pub enum ChangelogAction {
    /// Merge fragments into the Unreleased section
    Merge(MergeCommand),

    /// List pending fragments
    Fragments(FragmentsCommand),
}

#[derive(Debug, Args, Clone)]
pub struct MergeCommand {
    /// Changelog file, relative to the app root
    #[arg(long, default_value = "CHANGELOG.md")]
    pub changelog: PathBuf,

    /// Fragments directory; defaults to `changelog.directory` from the configuration
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct FragmentsCommand {
    /// Fragments directory; defaults to `changelog.directory` from the configuration
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}
