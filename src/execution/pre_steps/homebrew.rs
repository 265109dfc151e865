use super::PreCommand;
use crate::commands::{CommandContext, FailurePolicy, Platform};
use std::path::Path;
use tracing::{error, info, warn};

const INSTALL_URL: &str = "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";
const LINUXBREW_BIN: &str = "/home/linuxbrew/.linuxbrew/bin";

/// Makes sure `brew` is on the PATH
pub struct HomebrewPreCommand {
    ctx: CommandContext,
}

impl HomebrewPreCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx }
    }

    pub fn boxed(ctx: &CommandContext) -> Box<dyn PreCommand> {
        Box::new(Self::new(ctx.clone()))
    }

    fn install(&self) {
        let script = format!("$(curl -fsSL {})", INSTALL_URL);
        let command = self.ctx.command(["/bin/bash", "-c", script.as_str()]);
        if let Err(err) = self.ctx.system(&command, FailurePolicy::Tolerate) {
            warn!("Homebrew install script failed: {}", err);
        }
    }

    fn add_linuxbrew_to_path(&self) {
        if !Path::new(LINUXBREW_BIN).exists() {
            return;
        }
        let path = self.ctx.env.get("PATH").unwrap_or_default();
        self.ctx.env.set("PATH", &format!("{}:{}", LINUXBREW_BIN, path));
        info!("Added Linuxbrew to PATH");
    }
}

impl PreCommand for HomebrewPreCommand {
    fn name(&self) -> &str {
        "homebrew"
    }

    fn description(&self) -> String {
        "Ensure Homebrew is installed".to_string()
    }

    fn execute(&mut self) -> bool {
        if self.ctx.shell.has_program("brew") {
            info!("Homebrew found");
            return true;
        }

        info!("Homebrew not found. Installing...");
        match self.ctx.platform {
            Platform::MacOs => self.install(),
            Platform::Linux => {
                self.install();
                self.add_linuxbrew_to_path();
            }
            Platform::Other => {
                warn!("Unsupported platform for automatic Homebrew installation; see https://brew.sh");
                return false;
            }
        }

        if !self.ctx.shell.has_program("brew") {
            error!("Homebrew installation failed or brew is not on the PATH");
            return false;
        }
        info!("Homebrew installed successfully");
        true
    }
}
