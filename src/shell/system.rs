//! Shell executor backed by real processes

use super::{ShellCommand, ShellExecutor, ShellOutput};
use std::process::{Command, Stdio};
use tracing::debug;

/// Runs commands with [`std::process::Command`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

impl SystemShell {
    pub fn new() -> Self {
        Self
    }

    fn build(command: &ShellCommand) -> Option<Command> {
        let (program, args) = command.argv.split_first()?;
        let mut cmd = Command::new(program);
        cmd.args(args);
        for (key, value) in &command.env {
            cmd.env(key, value);
        }
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }
        Some(cmd)
    }
}

impl ShellExecutor for SystemShell {
    fn run(&self, command: &ShellCommand) -> ShellOutput {
        debug!("Running `{}`", command);
        let Some(mut cmd) = Self::build(command) else {
            return ShellOutput::failure("empty command");
        };
        match cmd.stdin(Stdio::null()).output() {
            Ok(output) => ShellOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                success: output.status.success(),
            },
            Err(e) => ShellOutput::failure(format!("Failed to run '{}': {}", command.program(), e)),
        }
    }

    fn run_quiet(&self, command: &ShellCommand) -> bool {
        let Some(mut cmd) = Self::build(command) else {
            return false;
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_captures_stdout() {
        let output = SystemShell.run(&ShellCommand::new(["echo", "hello"]));
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn test_non_zero_exit_is_data() {
        let output = SystemShell.run(&ShellCommand::shell("echo oops >&2; exit 3"));
        assert!(!output.success);
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[test]
    fn test_missing_program_is_data() {
        let output = SystemShell.run(&ShellCommand::new(["releasekit-definitely-not-a-program"]));
        assert!(!output.success);
        assert!(output.stderr.contains("releasekit-definitely-not-a-program"));
        assert!(!SystemShell.run_quiet(&ShellCommand::new(["releasekit-definitely-not-a-program"])));
    }

    #[test]
    fn test_env_and_cwd() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker"), "").unwrap();
        let output = SystemShell.run(
            &ShellCommand::shell("ls; echo $GREETING")
                .env("GREETING", "hi")
                .current_dir(dir.path()),
        );
        assert!(output.success);
        assert!(output.stdout.contains("marker"));
        assert!(output.stdout.contains("hi"));
    }

    #[test]
    fn test_run_quiet() {
        assert!(SystemShell.run_quiet(&ShellCommand::new(["true"])));
        assert!(!SystemShell.run_quiet(&ShellCommand::new(["false"])));
        assert!(!SystemShell.run_quiet(&ShellCommand::new(Vec::<String>::new())));
    }
}
