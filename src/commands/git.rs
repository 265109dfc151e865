//! Repository-local git configuration

use super::{Command, CommandContext};
use crate::core::error::CommandResult;
use tracing::info;

pub struct GitCommand {
    ctx: CommandContext,
}

impl GitCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx }
    }

    pub fn boxed(ctx: &CommandContext) -> Box<dyn Command> {
        Box::new(Self::new(ctx.clone()))
    }

    fn set(&self, key: &str, value: &str) -> CommandResult {
        self.ctx
            .run(&self.ctx.command(["git", "config", "--local", key, value]))?;
        Ok(())
    }
}

impl Command for GitCommand {
    fn name(&self) -> &str {
        "git"
    }

    fn description(&self) -> String {
        "Setup git configuration".to_string()
    }

    fn can_execute(&self) -> bool {
        self.ctx.path(".git").is_dir()
    }

    fn execute(&mut self) -> CommandResult {
        info!("Setting up git configuration");

        if self.ctx.exists(".commit-template") {
            self.set("commit.template", ".commit-template")?;
            info!("Git commit template configured");
        }

        if self.ctx.path(".githooks").is_dir() {
            self.set("core.hooksPath", ".githooks")?;
            info!("Git hooks path configured");
        }

        for (key, value) in &self.ctx.config.git_config {
            self.set(key, value)?;
            info!("Set git config {}", key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Configuration;
    use crate::shell::MockShell;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_configures_template_hooks_and_extra_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::create_dir(dir.path().join(".githooks")).unwrap();
        std::fs::write(dir.path().join(".commit-template"), "Subject\n").unwrap();

        let mut config = Configuration::default();
        config.git_config.insert("pull.rebase".to_string(), "true".to_string());
        config.git_config.insert("user.name".to_string(), "Jane Doe".to_string());
        let shell = MockShell::new();
        let ctx = CommandContext::new(Arc::new(config), dir.path(), Arc::new(shell.clone()));

        let mut cmd = GitCommand::new(ctx);
        assert!(cmd.can_execute());
        cmd.execute().unwrap();

        assert_eq!(
            shell.commands(),
            vec![
                "git config --local commit.template .commit-template",
                "git config --local core.hooksPath .githooks",
                "git config --local pull.rebase true",
                "git config --local user.name 'Jane Doe'",
            ]
        );
    }

    #[test]
    fn test_requires_git_directory() {
        let dir = TempDir::new().unwrap();
        let cmd = GitCommand::new(crate::commands::test_context(dir.path(), &MockShell::new()));
        assert!(!cmd.can_execute());
    }
}
