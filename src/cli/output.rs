//! CLI output formatting

use crate::changelog::Fragment;
use crate::core::state::{RunState, RunStatus};
use crate::execution::RunnerEvent;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

fn env_flag(key: &str) -> bool {
    std::env::var_os(key).is_some_and(|value| !value.is_empty())
}

/// Narrative console output is on unless `QUIET_SETUP` or `DISABLE_OUTPUT` is set
pub fn narrative_enabled() -> bool {
    !env_flag("QUIET_SETUP") && !env_flag("DISABLE_OUTPUT")
}

/// Spinners need a terminal and are off under `NO_SPINNER` or `CI`
pub fn spinner_enabled() -> bool {
    !env_flag("NO_SPINNER") && !env_flag("CI") && console::Term::stdout().is_term()
}

/// Create a spinner for a long-running command, if spinners are enabled
pub fn create_spinner(message: String) -> Option<ProgressBar> {
    if !spinner_enabled() {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}

/// Horizontal rule with an optional title, sized to the terminal
pub fn rule(title: &str) -> String {
    let width = term_size::dimensions_stdout()
        .map(|(w, _)| w)
        .unwrap_or(80)
        .min(100);
    if title.is_empty() {
        return "─".repeat(width);
    }
    let label = format!("── {} ", title);
    let fill = width.saturating_sub(label.chars().count());
    format!("{}{}", label, "─".repeat(fill))
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::NotStarted => style("NOT STARTED").dim().to_string(),
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Completed => style("COMPLETED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format a runner event for display
pub fn format_runner_event(event: &RunnerEvent) -> String {
    match event {
        RunnerEvent::RunStarted {
            run_id,
            app_name,
            total_commands,
        } => format!(
            "{} Setting up {} ({} steps, run {})",
            ROCKET,
            style(app_name).bold(),
            total_commands,
            style(&run_id.to_string()[..8]).dim()
        ),
        RunnerEvent::CommandSkipped { description, .. } => format!(
            "{} {} {}",
            INFO,
            style(description).dim(),
            style("(skipped)").dim()
        ),
        RunnerEvent::CommandStarted { description, .. } => {
            format!("{} {}", SPINNER, style(description).cyan())
        }
        RunnerEvent::CommandCompleted { description, .. } => {
            format!("{} {}", CHECK, style(description).green())
        }
        RunnerEvent::CommandWarned {
            description,
            message,
            ..
        } => format!(
            "{} {}: {}",
            WARN,
            style(description).yellow(),
            style(message).dim()
        ),
        RunnerEvent::CommandFailed {
            description,
            message,
            ..
        } => format!("{} {}: {}", CROSS, style(description).red(), style(message).dim()),
        RunnerEvent::RunFinished { run_id, status } => format!(
            "{} Run {} {}",
            INFO,
            style(&run_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    }
}

/// One-line summary of a finished run
pub fn format_run_summary(state: &RunState) -> String {
    let duration = match (state.started_at, state.completed_at) {
        (Some(start), Some(end)) => end
            .signed_duration_since(start)
            .to_std()
            .map(format_duration)
            .unwrap_or_default(),
        _ => String::new(),
    };
    format!(
        "{} executed, {} skipped, {} warned {}",
        style(state.executed.len()).green(),
        style(state.skipped.len()).dim(),
        style(state.warned.len()).yellow(),
        style(duration).dim()
    )
}

/// Format a pending fragment for `changelog fragments`
pub fn format_fragment(fragment: &Fragment) -> String {
    let file = fragment
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match &fragment.section {
        Some(section) => format!("{} {:<12} {}", CHECK, style(section).bold(), file),
        None => format!(
            "{} {:<12} {} {}",
            WARN,
            style(&fragment.candidate).yellow(),
            file,
            style("(unknown section, will be skipped)").dim()
        ),
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
