//! Ruby gems through Bundler

use super::{Command, CommandContext};
use crate::core::error::CommandResult;
use tracing::info;

pub struct BundlerCommand {
    ctx: CommandContext,
}

impl BundlerCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx }
    }

    pub fn boxed(ctx: &CommandContext) -> Box<dyn Command> {
        Box::new(Self::new(ctx.clone()))
    }
}

impl Command for BundlerCommand {
    fn name(&self) -> &str {
        "bundler"
    }

    fn description(&self) -> String {
        "Install Ruby dependencies".to_string()
    }

    fn can_execute(&self) -> bool {
        self.ctx.exists("Gemfile")
    }

    fn execute(&mut self) -> CommandResult {
        info!("Installing dependencies");
        self.ctx
            .run(&self.ctx.command(["gem", "install", "bundler", "--conservative"]))?;
        if !self.ctx.succeeds(&self.ctx.command(["bundle", "check"])) {
            self.ctx.run(&self.ctx.command(["bundle", "install"]))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_context;
    use crate::shell::MockShell;
    use std::path::Path;

    #[test]
    fn test_skips_install_when_bundle_is_satisfied() {
        let shell = MockShell::new();
        BundlerCommand::new(test_context(Path::new("/app"), &shell))
            .execute()
            .unwrap();
        assert_eq!(
            shell.commands(),
            vec!["gem install bundler --conservative", "bundle check"]
        );
    }

    #[test]
    fn test_installs_when_check_fails() {
        let shell = MockShell::new();
        shell.fail("bundle check", "The following gems are missing");
        BundlerCommand::new(test_context(Path::new("/app"), &shell))
            .execute()
            .unwrap();
        assert!(shell.ran("bundle install"));
    }
}
