//! Scripted shell executor for tests and dry runs
//!
//! Records every command and answers from a list of substring rules. Commands
//! with no matching rule succeed with empty output.

use super::{ShellCommand, ShellExecutor, ShellOutput};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug)]
struct Rule {
    pattern: String,
    /// Consumed front to back; the last response repeats
    responses: VecDeque<ShellOutput>,
}

/// Mock executor that records calls and returns canned output
#[derive(Debug, Clone, Default)]
pub struct MockShell {
    rules: Arc<Mutex<Vec<Rule>>>,
    calls: Arc<Mutex<Vec<ShellCommand>>>,
}

impl MockShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands whose display form contains `pattern` with `output`.
    ///
    /// Calling this again with the same pattern queues another response.
    pub fn respond(&self, pattern: impl Into<String>, output: ShellOutput) -> &Self {
        let pattern = pattern.into();
        let mut rules = self.rules.lock();
        match rules.iter_mut().find(|rule| rule.pattern == pattern) {
            Some(rule) => rule.responses.push_back(output),
            None => rules.push(Rule {
                pattern,
                responses: VecDeque::from([output]),
            }),
        }
        self
    }

    /// Make commands containing `pattern` fail with `stderr`
    pub fn fail(&self, pattern: impl Into<String>, stderr: impl Into<String>) -> &Self {
        self.respond(pattern, ShellOutput::failure(stderr))
    }

    /// Make commands containing `pattern` succeed with `stdout`
    pub fn succeed(&self, pattern: impl Into<String>, stdout: impl Into<String>) -> &Self {
        self.respond(pattern, ShellOutput::success(stdout))
    }

    /// Every command run so far
    pub fn calls(&self) -> Vec<ShellCommand> {
        self.calls.lock().clone()
    }

    /// Display form of every command run so far
    pub fn commands(&self) -> Vec<String> {
        self.calls.lock().iter().map(ToString::to_string).collect()
    }

    /// Whether any command containing `pattern` was run
    pub fn ran(&self, pattern: &str) -> bool {
        self.count(pattern) > 0
    }

    /// Number of commands containing `pattern`
    pub fn count(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|cmd| cmd.to_string().contains(pattern))
            .count()
    }

    /// Index of the first command containing `pattern`
    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.calls
            .lock()
            .iter()
            .position(|cmd| cmd.to_string().contains(pattern))
    }
}

impl ShellExecutor for MockShell {
    fn run(&self, command: &ShellCommand) -> ShellOutput {
        self.calls.lock().push(command.clone());
        let rendered = command.to_string();
        let mut rules = self.rules.lock();
        match rules.iter_mut().find(|rule| rendered.contains(&rule.pattern)) {
            Some(rule) if rule.responses.len() > 1 => rule.responses.pop_front().unwrap_or_default(),
            Some(rule) => rule.responses.front().cloned().unwrap_or_default(),
            None => ShellOutput::success(""),
        }
    }
}
