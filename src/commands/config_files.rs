//! Local configuration files from their checked-in examples

use super::{copy_if_missing, Command, CommandContext};
use crate::core::error::{CommandError, CommandResult};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct ConfigCommand {
    ctx: CommandContext,
}

impl ConfigCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx }
    }

    pub fn boxed(ctx: &CommandContext) -> Box<dyn Command> {
        Box::new(Self::new(ctx.clone()))
    }

    /// Every `config/**/*.example` file, sorted
    fn example_files(&self) -> CommandResult<Vec<PathBuf>> {
        let pattern = self.ctx.path("config/**/*.example");
        let pattern = pattern.to_string_lossy();
        let paths = glob::glob(&pattern)
            .map_err(|e| CommandError::InvalidData(format!("bad glob pattern {}: {}", pattern, e)))?;

        let mut files = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable path: {}", e),
            }
        }
        files.sort();
        Ok(files)
    }

    fn relative<'a>(&self, path: &'a Path) -> std::borrow::Cow<'a, str> {
        path.strip_prefix(&self.ctx.app_root)
            .unwrap_or(path)
            .to_string_lossy()
    }
}

impl Command for ConfigCommand {
    fn name(&self) -> &str {
        "config"
    }

    fn description(&self) -> String {
        "Setup configuration files".to_string()
    }

    fn execute(&mut self) -> CommandResult {
        info!("Ensuring configuration files are present");

        copy_if_missing(&self.ctx.path("Procfile.dev"), &self.ctx.path("Procfile"))?;

        for example in self.example_files()? {
            let target = example.with_extension("");
            if copy_if_missing(&example, &target)? {
                info!("Copied {} to {}", self.relative(&example), self.relative(&target));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_context;
    use crate::shell::MockShell;
    use tempfile::TempDir;

    #[test]
    fn test_copies_examples_without_overwriting() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("config/credentials")).unwrap();
        std::fs::write(root.join("config/database.yml.example"), "adapter: postgresql\n").unwrap();
        std::fs::write(root.join("config/credentials/dev.key.example"), "secret\n").unwrap();
        std::fs::write(root.join("config/storage.yml.example"), "new\n").unwrap();
        std::fs::write(root.join("config/storage.yml"), "local\n").unwrap();
        std::fs::write(root.join("Procfile.dev"), "web: bin/rails s\n").unwrap();

        let mut cmd = ConfigCommand::new(test_context(root, &MockShell::new()));
        assert!(cmd.can_execute());
        cmd.execute().unwrap();

        assert_eq!(
            std::fs::read_to_string(root.join("config/database.yml")).unwrap(),
            "adapter: postgresql\n"
        );
        assert!(root.join("config/credentials/dev.key").exists());
        assert_eq!(std::fs::read_to_string(root.join("config/storage.yml")).unwrap(), "local\n");
        assert_eq!(std::fs::read_to_string(root.join("Procfile")).unwrap(), "web: bin/rails s\n");
    }

    #[test]
    fn test_no_config_directory() {
        let dir = TempDir::new().unwrap();
        ConfigCommand::new(test_context(dir.path(), &MockShell::new()))
            .execute()
            .unwrap();
        assert!(!dir.path().join("Procfile").exists());
    }
}
