//! JavaScript dependencies through Yarn or npm

use super::{Command, CommandContext};
use crate::core::error::CommandResult;
use serde::Deserialize;
use tracing::{info, warn};

const FALLBACK_YARN: &str = "yarn@stable";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    #[serde(default)]
    package_manager: Option<String>,
}

pub struct YarnCommand {
    ctx: CommandContext,
}

impl YarnCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx }
    }

    pub fn boxed(ctx: &CommandContext) -> Box<dyn Command> {
        Box::new(Self::new(ctx.clone()))
    }

    /// Yarn version pinned by `packageManager`, without its integrity hash
    fn pinned_yarn(&self) -> String {
        let path = self.ctx.path("package.json");
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => return FALLBACK_YARN.to_string(),
        };
        match serde_json::from_str::<PackageJson>(&content) {
            Ok(PackageJson {
                package_manager: Some(spec),
            }) if spec.starts_with("yarn@") => {
                let spec = spec.split('+').next().unwrap_or(FALLBACK_YARN).to_string();
                info!("Using {} from package.json", spec);
                spec
            }
            Ok(_) => FALLBACK_YARN.to_string(),
            Err(e) => {
                warn!("Could not parse package.json: {}", e);
                FALLBACK_YARN.to_string()
            }
        }
    }
}

impl Command for YarnCommand {
    fn name(&self) -> &str {
        "yarn"
    }

    fn description(&self) -> String {
        "Install JavaScript dependencies".to_string()
    }

    fn can_execute(&self) -> bool {
        self.ctx.exists("package.json")
    }

    fn execute(&mut self) -> CommandResult {
        info!("Installing Node modules");

        if self.ctx.exists("yarn.lock") {
            if self.ctx.shell.has_program("corepack") {
                self.ctx.run(&self.ctx.command(["corepack", "enable"]))?;
                let yarn = self.pinned_yarn();
                self.ctx.run(&self.ctx.command(["corepack", "use", yarn.as_str()]))?;
            }
            if !self
                .ctx
                .succeeds(&self.ctx.command(["yarn", "check", "--check-files"]))
            {
                self.ctx.run(&self.ctx.command(["yarn", "install"]))?;
            }
        } else if self.ctx.exists("package-lock.json") {
            info!("Found package-lock.json, using npm");
            self.ctx.run(&self.ctx.command(["npm", "ci"]))?;
        } else if self.ctx.exists("package.json") {
            if self.ctx.shell.has_program("yarn") {
                self.ctx.run(&self.ctx.command(["yarn", "install"]))?;
            } else {
                self.ctx.run(&self.ctx.command(["npm", "install"]))?;
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

    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_yarn_with_pinned_package_manager() {
        let dir = project(&[
            ("package.json", r#"{"packageManager": "yarn@4.1.0+sha512.abc"}"#),
            ("yarn.lock", ""),
        ]);
        let shell = MockShell::new();
        shell.fail("yarn check", "missing packages");
        YarnCommand::new(test_context(dir.path(), &shell)).execute().unwrap();

        assert!(shell.ran("corepack enable"));
        assert!(shell.ran("corepack use yarn@4.1.0"));
        assert!(!shell.ran("sha512"));
        assert!(shell.ran("yarn install"));
    }

    #[test]
    fn test_yarn_falls_back_to_stable_on_bad_package_json() {
        let dir = project(&[("package.json", "{ not json"), ("yarn.lock", "")]);
        let shell = MockShell::new();
        YarnCommand::new(test_context(dir.path(), &shell)).execute().unwrap();

        assert!(shell.ran("corepack use yarn@stable"));
        assert!(!shell.ran("yarn install"));
    }

    #[test]
    fn test_npm_ci_with_lockfile() {
        let dir = project(&[("package.json", "{}"), ("package-lock.json", "{}")]);
        let shell = MockShell::new();
        YarnCommand::new(test_context(dir.path(), &shell)).execute().unwrap();
        assert_eq!(shell.commands(), vec!["npm ci"]);
    }

    #[test]
    fn test_plain_package_json_prefers_yarn() {
        let dir = project(&[("package.json", "{}")]);
        let shell = MockShell::new();
        shell.fail("which yarn", "");
        YarnCommand::new(test_context(dir.path(), &shell)).execute().unwrap();
        assert!(shell.ran("npm install"));
    }
}
