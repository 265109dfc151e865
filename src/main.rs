use anyhow::{Context, Result};
use parking_lot::Mutex;
use releasekit::changelog::{ChangelogSettings, FragmentMerger};
use releasekit::cli::commands::{ChangelogAction, FragmentsCommand, MergeCommand, SetupCommand, StepsCommand, ValidateCommand};
use releasekit::cli::output::*;
use releasekit::cli::{Cli, Command};
use releasekit::commands::ConfirmPolicy;
use releasekit::core::config::Configuration;
use releasekit::core::env::ProcessEnv;
use releasekit::execution::{PrerequisitesLoader, RunnerEvent, Setup};
use releasekit::shell::SystemShell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; --verbose beats RUST_LOG
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let app_root = cli
        .app_root()
        .context("Failed to determine the application root")?;
    let confirm = if cli.yes {
        ConfirmPolicy::AssumeYes
    } else {
        ConfirmPolicy::Ask
    };
    let setup = Setup::new(&cli.config, &app_root).with_confirm(confirm);

    match &cli.command {
        Command::Setup(cmd) => run_setup(setup, cmd)?,
        Command::Prereqs(_) => run_prereqs(&setup)?,
        Command::Steps(cmd) => list_steps(&setup, cmd)?,
        Command::Validate(cmd) => validate_config(&setup, cmd)?,
        Command::Changelog(cmd) => match &cmd.action {
            ChangelogAction::Merge(merge) => merge_fragments(&setup, merge)?,
            ChangelogAction::Fragments(list) => list_fragments(&setup, list)?,
        },
    }

    Ok(())
}

fn run_setup(setup: Setup, cmd: &SetupCommand) -> Result<()> {
    for (key, value) in &cmd.env {
        std::env::set_var(key, value);
    }

    let mut setup = setup.skip(cmd.skip.iter().cloned());
    let narrative = narrative_enabled();

    if narrative {
        println!("{}", style(rule("Setup")).dim());
        let spinner: Mutex<Option<indicatif::ProgressBar>> = Mutex::new(None);
        setup.add_event_handler(move |event| {
            if let Some(current) = spinner.lock().take() {
                current.finish_and_clear();
            }
            if let RunnerEvent::CommandStarted { description, .. } = &event {
                if let Some(started) = create_spinner(description.clone()) {
                    *spinner.lock() = Some(started);
                    return;
                }
            }
            println!("{}", format_runner_event(&event));
        });
    }

    match setup.run() {
        Ok(state) => {
            if narrative {
                println!(
                    "\n{} {}",
                    CHECK,
                    style("Setup completed successfully!").green()
                );
                println!("  {}", format_run_summary(&state));
            }
            Ok(())
        }
        Err(err) => {
            println!("\n{} {}", CROSS, style("Setup failed").red());
            error!("{:#}", err);
            std::process::exit(1);
        }
    }
}

fn run_prereqs(setup: &Setup) -> Result<()> {
    let config_path = setup.config_path();
    let ran = PrerequisitesLoader::run_from_file(
        &config_path,
        setup.app_root(),
        Arc::new(SystemShell::new()),
        Arc::new(ProcessEnv),
    )?;
    if ran {
        println!("{} Prerequisites complete", CHECK);
    } else {
        println!(
            "{} No configuration at {}, nothing to do",
            WARN,
            style(config_path.display()).dim()
        );
    }
    Ok(())
}

fn list_steps(setup: &Setup, cmd: &StepsCommand) -> Result<()> {
    let config = setup.load_config()?;
    let mut runner = setup.runner(setup.context(config));

    let steps: Vec<(String, String, bool)> = runner
        .commands()
        .iter()
        .map(|command| {
            (
                command.name().to_string(),
                command.description(),
                command.can_execute(),
            )
        })
        .collect();

    if cmd.json {
        let data: Vec<_> = steps
            .iter()
            .map(|(name, description, applicable)| {
                serde_json::json!({
                    "name": name,
                    "description": description,
                    "applicable": applicable,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "steps": data }))?);
        return Ok(());
    }

    println!("{} Setup steps:", INFO);
    for (index, (name, description, applicable)) in steps.iter().enumerate() {
        let marker = if *applicable { CHECK } else { INFO };
        let note = if *applicable { "" } else { " (skipped: prerequisites not met)" };
        println!(
            "  {:>2}. {}{:<10} {}{}",
            index + 1,
            marker,
            style(name).bold(),
            description,
            style(note).dim()
        );
    }
    Ok(())
}

fn validate_config(setup: &Setup, cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating configuration...", INFO);

    match setup.load_config() {
        Ok(config) => {
            println!("{} Configuration is valid!", CHECK);
            println!("  App: {}", style(&config.app_name).bold());
            let steps = if config.steps.is_empty() {
                "all registered".to_string()
            } else {
                config.steps.join(", ")
            };
            println!("  Steps: {}", style(steps).cyan());
            println!("  Custom steps: {}", style(config.custom_steps.len()).cyan());
            println!("  Pre-steps: {}", style(config.pre_steps.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

/// Changelog settings from the configuration file, or defaults without one
fn changelog_settings(setup: &Setup) -> Result<ChangelogSettings> {
    Ok(Configuration::load_or_default(setup.config_path())?.changelog)
}

fn fragments_dir(setup: &Setup, settings: &ChangelogSettings, dir: Option<&PathBuf>) -> PathBuf {
    let dir = dir.map(PathBuf::as_path).unwrap_or(Path::new(&settings.directory));
    setup.app_root().join(dir)
}

fn merge_fragments(setup: &Setup, cmd: &MergeCommand) -> Result<()> {
    let settings = changelog_settings(setup)?;
    let dir = fragments_dir(setup, &settings, cmd.dir.as_ref());
    let changelog = setup.app_root().join(&cmd.changelog);

    let report = FragmentMerger::new(settings).merge_with_report(&changelog, &dir)?;

    for skipped in &report.skipped {
        println!(
            "{} Left {} in place (unknown section)",
            WARN,
            style(skipped.display()).yellow()
        );
    }
    if report.changelog_updated {
        println!(
            "{} Merged {} fragment(s) into {}",
            CHECK,
            style(report.merged.len()).cyan(),
            style(changelog.display()).bold()
        );
    } else {
        println!("{} No changelog changes", INFO);
    }
    if report.consumed.len() > report.merged.len() {
        println!(
            "{} Removed {} empty fragment(s)",
            INFO,
            report.consumed.len() - report.merged.len()
        );
    }
    Ok(())
}

fn list_fragments(setup: &Setup, cmd: &FragmentsCommand) -> Result<()> {
    let settings = changelog_settings(setup)?;
    let dir = fragments_dir(setup, &settings, cmd.dir.as_ref());
    let fragments = FragmentMerger::new(settings).list_fragments(&dir)?;

    if cmd.json {
        let data: Vec<_> = fragments
            .iter()
            .map(|fragment| {
                serde_json::json!({
                    "path": fragment.path,
                    "candidate": fragment.candidate,
                    "section": fragment.section,
                    "summary": fragment.summary,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "fragments": data }))?);
        return Ok(());
    }

    if fragments.is_empty() {
        println!("{} No pending fragments in {}", INFO, style(dir.display()).dim());
        return Ok(());
    }
    println!("{} Pending fragments in {}:", INFO, style(dir.display()).dim());
    for fragment in &fragments {
        println!("  {}", format_fragment(fragment));
    }
    Ok(())
}
