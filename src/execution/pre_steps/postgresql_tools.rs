use super::PreCommand;
use crate::commands::{CommandContext, Platform};
use tracing::{info, warn};

/// Makes sure the PostgreSQL client tools (`pg_dump`, `psql`) are installed
pub struct PostgresqlToolsPreCommand {
    ctx: CommandContext,
}

impl PostgresqlToolsPreCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx }
    }

    pub fn boxed(ctx: &CommandContext) -> Box<dyn PreCommand> {
        Box::new(Self::new(ctx.clone()))
    }

    fn version(&self) -> &str {
        match self.ctx.config.database.version.trim() {
            "" => "14",
            version => version,
        }
    }

    fn install_with_brew(&self) -> bool {
        let formula = format!("postgresql@{}", self.version());
        info!("Installing PostgreSQL {} client tools via Homebrew", self.version());
        if self.ctx.succeeds(&self.ctx.command(["brew", "install", formula.as_str()])) {
            info!("PostgreSQL {} client tools installed successfully", self.version());
            return true;
        }
        warn!("Failed to install PostgreSQL client tools; try `brew install {}`", formula);
        false
    }

    fn install_with_apt(&self) -> bool {
        let version = self.version();
        let package = format!("postgresql-client-{}", version);
        if !self.ctx.shell.has_program("apt-get") {
            warn!("apt-get not found; install {} with your package manager", package);
            return false;
        }

        info!("Installing PostgreSQL {} client tools via apt", version);
        let install = self.ctx.command(["sudo", "apt-get", "install", "-y", package.as_str()]);
        if !self.ctx.succeeds(&install) {
            warn!("Failed to install PostgreSQL client tools; try `sudo apt-get install {}`", package);
            return false;
        }

        let priority = (version.parse::<u32>().unwrap_or(0) * 10).to_string();
        for tool in ["pg_dump", "psql"] {
            let link = format!("/usr/bin/{}", tool);
            let target = format!("/usr/lib/postgresql/{}/bin/{}", version, tool);
            let alternatives = self.ctx.command([
                "sudo",
                "update-alternatives",
                "--install",
                link.as_str(),
                tool,
                target.as_str(),
                priority.as_str(),
            ]);
            if !self.ctx.succeeds(&alternatives) {
                warn!("Could not register {} with update-alternatives", tool);
            }
        }
        info!("PostgreSQL {} client tools installed successfully", version);
        true
    }
}

impl PreCommand for PostgresqlToolsPreCommand {
    fn name(&self) -> &str {
        "postgresql_tools"
    }

    fn description(&self) -> String {
        "Ensure PostgreSQL client tools are installed".to_string()
    }

    fn execute(&mut self) -> bool {
        if self.ctx.shell.has_program("pg_dump") {
            info!("PostgreSQL client tools found");
            return true;
        }

        info!("PostgreSQL client tools (pg_dump) not found");
        match self.ctx.platform {
            Platform::MacOs => self.install_with_brew(),
            Platform::Linux => self.install_with_apt(),
            Platform::Other => {
                warn!("Unsupported platform for PostgreSQL client tools installation");
                false
            }
        }
    }
}
