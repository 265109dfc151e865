//! External command execution
//!
//! Every command goes through a [`ShellExecutor`], which captures output and
//! exit status as data. A non-zero exit never becomes an error at this layer;
//! callers decide per call site whether it is fatal.

mod mock;
mod system;

pub use mock::MockShell;
pub use system::SystemShell;

use std::fmt;
use std::path::PathBuf;

/// A command line plus its environment overrides and working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl ShellCommand {
    /// Command from an explicit argv, e.g. `["bin/rails", "db:migrate"]`
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            cwd: None,
        }
    }

    /// Run `script` through `sh -c`, for pipelines and `||` fallbacks
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new(["sh".to_string(), "-c".to_string(), script.into()])
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Name of the program being run
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, value)?;
        }
        if let [sh, flag, script] = self.argv.as_slice() {
            if sh == "sh" && flag == "-c" {
                return write!(f, "{}", script);
            }
        }
        let rendered: Vec<String> = self
            .argv
            .iter()
            .map(|arg| {
                if arg.contains('\'') {
                    format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
                } else if arg.is_empty() || arg.contains(char::is_whitespace) {
                    format!("'{}'", arg)
                } else {
                    arg.clone()
                }
            })
            .collect();
        write!(f, "{}", rendered.join(" "))
    }
}

/// Captured result of running a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl ShellOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }

    /// Text to show when the command failed: stderr, else stdout
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Runs external commands
pub trait ShellExecutor: Send + Sync {
    /// Run a command and capture stdout, stderr and success
    fn run(&self, command: &ShellCommand) -> ShellOutput;

    /// Run a command discarding output; used to probe for tools
    fn run_quiet(&self, command: &ShellCommand) -> bool {
        self.run(command).success
    }

    /// Whether `program` is on the PATH
    fn has_program(&self, program: &str) -> bool {
        self.run_quiet(&ShellCommand::new(["which", program]))
    }
}
