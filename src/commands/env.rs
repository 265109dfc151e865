//! `.env` from `.env.example`

use super::{copy_if_missing, Command, CommandContext};
use crate::core::error::CommandResult;
use tracing::{info, warn};

pub struct EnvCommand {
    ctx: CommandContext,
}

impl EnvCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx }
    }

    pub fn boxed(ctx: &CommandContext) -> Box<dyn Command> {
        Box::new(Self::new(ctx.clone()))
    }
}

impl Command for EnvCommand {
    fn name(&self) -> &str {
        "env"
    }

    fn description(&self) -> String {
        "Setup environment file".to_string()
    }

    fn can_execute(&self) -> bool {
        self.ctx.exists(".env.example")
    }

    fn execute(&mut self) -> CommandResult {
        let target = self.ctx.path(".env");
        if target.exists() {
            info!(".env file already exists. Skipping.");
            return Ok(());
        }
        let example = self.ctx.path(".env.example");
        if !example.exists() {
            warn!(".env.example not found. Skipping .env creation");
            return Ok(());
        }

        info!("Creating .env from .env.example");
        copy_if_missing(&example, &target)?;
        Ok(())
    }
}
