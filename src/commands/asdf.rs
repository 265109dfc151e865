//! Tool versions through asdf

use super::{Command, CommandContext};
use crate::core::error::CommandResult;
use tracing::info;

/// Plugins this command knows how to add: (plugin, repository, `.tool-versions` marker)
const PLUGINS: &[(&str, &str, &str)] = &[
    ("nodejs", "https://github.com/asdf-vm/asdf-nodejs.git", "node"),
    ("ruby", "https://github.com/asdf-vm/asdf-ruby.git", "ruby"),
];

pub struct AsdfCommand {
    ctx: CommandContext,
}

impl AsdfCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx }
    }

    pub fn boxed(ctx: &CommandContext) -> Box<dyn Command> {
        Box::new(Self::new(ctx.clone()))
    }

    fn installed_plugins(&self) -> Vec<String> {
        let output = self.ctx.shell.run(&self.ctx.command(["asdf", "plugin", "list"]));
        if !output.success {
            return Vec::new();
        }
        output.stdout.lines().map(|line| line.trim().to_string()).collect()
    }
}

impl Command for AsdfCommand {
    fn name(&self) -> &str {
        "asdf"
    }

    fn description(&self) -> String {
        "Install tool versions with asdf".to_string()
    }

    fn can_execute(&self) -> bool {
        self.ctx.exists(".tool-versions")
    }

    fn execute(&mut self) -> CommandResult {
        info!("Install tool-versions dependencies via ASDF");

        if !self.ctx.shell.has_program("asdf") {
            info!("asdf not installed. Run `brew install asdf` if you want setup to ensure versions are up-to-date");
            return Ok(());
        }

        let tool_versions = match std::fs::read_to_string(self.ctx.path(".tool-versions")) {
            Ok(content) => content,
            Err(_) => {
                info!("No .tool-versions file found");
                return Ok(());
            }
        };
        let dependencies: Vec<&str> = tool_versions
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        let installed = self.installed_plugins();
        let mut installables = Vec::new();
        for (plugin, repository, marker) in PLUGINS {
            if installed.iter().any(|name| name == plugin) {
                continue;
            }
            let wanted: Vec<&str> = dependencies
                .iter()
                .copied()
                .filter(|line| line.contains(marker))
                .collect();
            if wanted.is_empty() {
                continue;
            }
            if self.ctx.confirm(&format!("Install asdf to manage {}?", plugin)) {
                self.ctx
                    .run(&self.ctx.command(["asdf", "plugin", "add", plugin, repository]))?;
                installables.extend(wanted);
            }
        }

        for name_version in installables {
            let mut argv = vec!["asdf", "install"];
            argv.extend(name_version.split_whitespace());
            self.ctx.run(&self.ctx.command(argv))?;
        }
        Ok(())
    }
}
