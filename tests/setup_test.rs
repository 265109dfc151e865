//! Full setup runs over a temporary Rails-style checkout with a scripted shell

mod helpers;

use helpers::TempProject;
use releasekit::commands::{CommandRegistry, ConfirmPolicy};
use releasekit::core::env::{EnvStore, MemoryEnv};
use releasekit::core::state::RunStatus;
use releasekit::execution::Setup;
use releasekit::shell::MockShell;
use std::sync::Arc;

const SETUP_YML: &str = r#"
app_name: Storefront
database:
  name: db-storefront
steps: [env, config, bundler, yarn, database, git, pg_tools, not_a_step]
pre_steps:
  - postgresql_tools
custom_steps:
  - command: "bin/rails assets:precompile"
    description: "Precompile assets"
    condition: "File.exist?('Gemfile')"
  - command: "bin/rails webpacker:compile"
    condition: "File.exist?('config/webpacker.yml')"
"#;

fn project() -> TempProject {
    TempProject::new()
        .file("config/setup.yml", SETUP_YML)
        .file("config/database.yml.example", "development:\n  database: storefront\n")
        .file("Gemfile", "source 'https://rubygems.org'\n")
        .file("package.json", "{}\n")
        .file("package-lock.json", "{}\n")
        .file(".env.example", "SECRET=changeme\n")
        .file("bin/rails", "#!/usr/bin/env ruby\n")
        .dir(".git")
}

fn setup(project: &TempProject, shell: &MockShell, env: &Arc<MemoryEnv>) -> Setup {
    Setup::new("config/setup.yml", project.root())
        .with_shell(Arc::new(shell.clone()))
        .with_env(env.clone())
        .with_confirm(ConfirmPolicy::AssumeYes)
        .with_registry(CommandRegistry::builtin())
}

#[test]
fn test_full_setup_run() {
    let project = project();
    let shell = MockShell::new();
    let env = Arc::new(MemoryEnv::new());

    let state = setup(&project, &shell, &env).run().unwrap();

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(
        state.executed,
        vec!["env", "config", "bundler", "yarn", "database", "git", "pg_tools", "custom", "custom"]
    );

    // prerequisites export the database settings before the pipeline reads them
    assert_eq!(env.get("DB_NAME").as_deref(), Some("storefront"));
    assert_eq!(env.get("DB_PORT").as_deref(), Some("5432"));
    assert!(shell.ran("datname = 'storefront_test'"));

    let bundler = shell.position("gem install bundler").unwrap();
    let npm = shell.position("npm ci").unwrap();
    let database = shell.position("bin/rails db:drop db:create").unwrap();
    let assets = shell.position("bin/rails assets:precompile").unwrap();
    assert!(bundler < npm && npm < database && database < assets);
    assert!(!shell.ran("webpacker:compile"));

    assert_eq!(project.read(".env"), "SECRET=changeme\n");
    assert!(project.exists("config/database.yml"));
    assert!(project.exists("bin/pg-tools/psql"));
    assert!(project.exists("bin/pg-tools/pg_dump"));
    assert_eq!(project.read(".envrc"), "PATH_add bin/pg-tools\n");
}

#[test]
fn test_failed_step_stops_setup() {
    let project = project();
    let shell = MockShell::new();
    shell.fail("db:migrate", "ActiveRecord::PendingMigrationError");
    let env = Arc::new(MemoryEnv::new());

    let err = setup(&project, &shell, &env).run().unwrap_err();

    let message = format!("{:#}", err);
    assert!(message.contains("Setup database"));
    assert!(message.contains("PendingMigrationError"));
    assert!(!shell.ran("db:seed"));
    assert!(!shell.ran("assets:precompile"));
    assert!(!project.exists("bin/pg-tools"));
    // steps before the failure still ran
    assert!(project.exists(".env"));
}

#[test]
fn test_existing_environment_is_respected() {
    let project = project();
    let shell = MockShell::new();
    let env = Arc::new(MemoryEnv::with_vars([("DB_NAME", "legacy"), ("DB_PORT", "5433")]));

    setup(&project, &shell, &env).run().unwrap();

    assert_eq!(env.get("PGPORT").as_deref(), Some("5433"));
    assert!(shell.ran("-p 5433"));
    assert!(shell.ran("datname = 'legacy'"));
    assert!(!shell.ran("datname = 'storefront'"));
}

#[test]
fn test_inapplicable_steps_are_skipped() {
    let project = TempProject::new().file("config/setup.yml", "steps: [bundler, yarn, env, git]\n");
    let shell = MockShell::new();
    let env = Arc::new(MemoryEnv::new());

    let state = setup(&project, &shell, &env).run().unwrap();

    assert_eq!(state.skipped, vec!["bundler", "yarn", "env", "git"]);
    assert!(state.executed.is_empty());
    assert!(shell.commands().is_empty());
}

#[test]
fn test_custom_step_conditions_see_exported_settings() {
    let project = TempProject::new().file(
        "config/setup.yml",
        r#"
database:
  name: db-shop
steps: [env]
custom_steps:
  - command: "bin/rails shop:warm_cache"
    condition: "ENV['DB_NAME'] == 'shop' && ENV['DB_PORT'] == '5432'"
  - command: "bin/rails legacy:import"
    condition: "ENV['DB_NAME'] == :legacy"
"#,
    );
    let shell = MockShell::new();
    let env = Arc::new(MemoryEnv::new());

    setup(&project, &shell, &env).run().unwrap();

    assert_eq!(shell.commands(), vec!["bin/rails shop:warm_cache"]);
}
