//! Development and test database bootstrap

use super::{Command, CommandContext, FailurePolicy};
use crate::core::error::CommandResult;
use crate::shell::ShellCommand;
use tracing::{debug, info};

pub struct DatabaseCommand {
    ctx: CommandContext,
}

impl DatabaseCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx }
    }

    pub fn boxed(ctx: &CommandContext) -> Box<dyn Command> {
        Box::new(Self::new(ctx.clone()))
    }

    /// `DB_NAME` if exported, else the configured name without its `db-` prefix
    pub fn primary_database(&self) -> String {
        match self.ctx.env.get("DB_NAME") {
            Some(name) if !name.is_empty() => name,
            _ => self.ctx.config.database.database_name(),
        }
    }

    fn port(&self) -> String {
        match self.ctx.env.get("DB_PORT") {
            Some(port) if !port.is_empty() => port,
            _ => self.ctx.config.database.port.to_string(),
        }
    }

    fn rails(&self, tasks: &[&str]) -> ShellCommand {
        let mut argv = vec!["bin/rails"];
        argv.extend_from_slice(tasks);
        self.ctx.command(argv)
    }

    /// Kick other sessions off `database` so it can be dropped
    fn terminate_connections(&self, database: &str) -> CommandResult {
        if !self.ctx.shell.has_program("psql") {
            debug!("psql not available, not terminating connections to {}", database);
            return Ok(());
        }
        let sql = format!(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
             WHERE datname = '{}' AND pid <> pg_backend_pid();",
            database.replace('\'', "''")
        );
        let port = self.port();
        let command = self
            .ctx
            .command([
                "psql", "-h", "localhost", "-p", port.as_str(), "-U", "postgres", "-d", "postgres",
                "-c", sql.as_str(),
            ])
            .env("PGPASSWORD", self.ctx.config.database.password.clone());
        self.ctx.system(&command, FailurePolicy::Tolerate)?;
        Ok(())
    }
}

impl Command for DatabaseCommand {
    fn name(&self) -> &str {
        "database"
    }

    fn description(&self) -> String {
        "Setup database".to_string()
    }

    fn can_execute(&self) -> bool {
        self.ctx.exists("bin/rails")
    }

    fn execute(&mut self) -> CommandResult {
        info!("Setting up database");
        let primary = self.primary_database();

        info!("Terminating existing database connections");
        self.terminate_connections(&primary)?;
        self.terminate_connections(&format!("{}_test", primary))?;

        info!("Dropping & recreating the development database");
        self.ctx.run(&self.rails(&["db:drop", "db:create"]))?;

        info!("Loading the database schema");
        self.ctx.run(&self.rails(&["db:schema:load", "db:migrate"]))?;

        info!("Seeding the database");
        let mut seed = self.rails(&["db:seed"]);
        if self.ctx.config.seed_env {
            seed = seed.env("SEED_DEV_ENV", "true");
        }
        self.ctx.run(&seed)?;

        info!("Dropping & recreating the test database");
        self.ctx.run(
            &self
                .rails(&["db:drop", "db:create", "db:schema:load"])
                .env("RAILS_ENV", "test"),
        )?;

        info!("Removing old logs and tempfiles");
        self.ctx
            .system(&self.rails(&["log:clear", "tmp:clear"]), FailurePolicy::Tolerate)?;
        Ok(())
    }
}
