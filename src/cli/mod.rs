//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ChangelogCommand, PrereqsCommand, SetupCommand, StepsCommand, ValidateCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Development environment setup and changelog tooling
#[derive(Debug, Parser, Clone)]
#[command(name = "releasekit")]
#[command(version)]
#[command(about = "Bootstraps a development environment and prepares changelogs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Setup configuration file, relative to the app root
    #[arg(short, long, global = true, default_value = crate::core::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Application root (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Answer yes to every installation prompt
    #[arg(short, long, global = true)]
    pub yes: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run prerequisites and every setup step
    Setup(SetupCommand),

    /// Export database settings and run pre-steps only
    Prereqs(PrereqsCommand),

    /// List the steps a setup run would execute
    Steps(StepsCommand),

    /// Validate the setup configuration
    Validate(ValidateCommand),

    /// Changelog fragment tasks
    Changelog(ChangelogCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// Application root: `--root`, else the current directory
    pub fn app_root(&self) -> std::io::Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir(),
        }
    }
}
