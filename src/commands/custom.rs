//! Operator-declared shell command gated by a condition

use super::{Command, CommandContext};
use crate::core::condition::ConditionEvaluator;
use crate::core::config::CustomStepConfig;
use crate::core::error::CommandResult;
use tracing::info;

pub struct CustomCommand {
    ctx: CommandContext,
    step: CustomStepConfig,
    evaluator: ConditionEvaluator,
}

impl CustomCommand {
    pub fn new(ctx: CommandContext, step: CustomStepConfig, evaluator: ConditionEvaluator) -> Self {
        Self {
            ctx,
            step,
            evaluator,
        }
    }

    pub fn step(&self) -> &CustomStepConfig {
        &self.step
    }
}

impl Command for CustomCommand {
    fn name(&self) -> &str {
        "custom"
    }

    fn description(&self) -> String {
        match &self.step.description {
            Some(description) if !description.trim().is_empty() => description.clone(),
            _ => format!("Custom command: {}", self.step.command),
        }
    }

    fn can_execute(&self) -> bool {
        !self.step.command.trim().is_empty()
    }

    fn execute(&mut self) -> CommandResult {
        if !self.evaluator.evaluate(self.step.condition.as_deref()) {
            info!("Skipping {} (condition not met)", self.description());
            return Ok(());
        }

        info!("Running: {}", self.description());
        self.ctx.run(&self.ctx.script(self.step.command.clone()))?;
        Ok(())
    }
}
