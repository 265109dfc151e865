//! Sequential setup runner

use crate::commands::{Command, CommandFactory, FailurePolicy};
use crate::core::error::{RunnerError, RunnerResult};
use crate::core::state::{RunState, RunStatus};
use std::sync::Arc;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

/// Events that can occur during a setup run
#[derive(Debug, Clone)]
pub enum RunnerEvent {
    RunStarted {
        run_id: Uuid,
        app_name: String,
        total_commands: usize,
    },
    CommandSkipped {
        name: String,
        description: String,
    },
    CommandStarted {
        name: String,
        description: String,
    },
    CommandCompleted {
        name: String,
        description: String,
    },
    /// A tolerated command failed and the run continued
    CommandWarned {
        name: String,
        description: String,
        message: String,
    },
    CommandFailed {
        name: String,
        description: String,
        message: String,
    },
    RunFinished {
        run_id: Uuid,
        status: RunStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(RunnerEvent) + Send + Sync>;

/// Runs the command pipeline one command at a time.
///
/// The command list is built from the factory on first access and can be
/// reshaped by name before [`Runner::run`].
pub struct Runner {
    factory: CommandFactory,
    commands: Option<Vec<Box<dyn Command>>>,
    state: RunState,
    event_handlers: Vec<EventHandler>,
}

impl Runner {
    pub fn new(factory: CommandFactory) -> Self {
        Self {
            factory,
            commands: None,
            state: RunState::new(),
            event_handlers: Vec::new(),
        }
    }

    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(RunnerEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    pub(crate) fn add_shared_handler(&mut self, handler: EventHandler) {
        self.event_handlers.push(handler);
    }

    fn emit_event(&self, event: RunnerEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn factory(&self) -> &CommandFactory {
        &self.factory
    }

    /// The pipeline, materialized on first call
    pub fn commands(&mut self) -> &mut Vec<Box<dyn Command>> {
        let factory = &self.factory;
        self.commands
            .get_or_insert_with(|| factory.create_all_commands())
    }

    pub fn command_names(&mut self) -> Vec<String> {
        self.commands()
            .iter()
            .map(|command| command.name().to_string())
            .collect()
    }

    pub fn add_command(&mut self, command: Box<dyn Command>) {
        self.commands().push(command);
    }

    /// Remove every command called `name`; no-op when there is none
    pub fn remove_command(&mut self, name: &str) {
        self.commands().retain(|command| command.name() != name);
    }

    /// Remove `name` and append `command` at the end of the pipeline.
    ///
    /// The replacement does not take the old command's position.
    pub fn replace_command(&mut self, name: &str, command: Box<dyn Command>) {
        self.remove_command(name);
        self.add_command(command);
    }

    /// Insert before the first command called `target`, or append
    pub fn insert_command_before(&mut self, target: &str, command: Box<dyn Command>) {
        let commands = self.commands();
        match commands.iter().position(|c| c.name() == target) {
            Some(index) => commands.insert(index, command),
            None => commands.push(command),
        }
    }

    /// Insert after the first command called `target`, or append
    pub fn insert_command_after(&mut self, target: &str, command: Box<dyn Command>) {
        let commands = self.commands();
        match commands.iter().position(|c| c.name() == target) {
            Some(index) => commands.insert(index + 1, command),
            None => commands.push(command),
        }
    }

    /// Run every applicable command in order, stopping at the first fatal failure
    pub fn run(&mut self) -> RunnerResult {
        if self.state.status != RunStatus::NotStarted {
            return Err(RunnerError::AlreadyRun);
        }

        let app_name = self.factory.context().config.app_name.clone();
        info!("Starting setup for {}", app_name);

        let mut commands = std::mem::take(self.commands());
        self.state.start(commands.len());
        self.emit_event(RunnerEvent::RunStarted {
            run_id: self.state.run_id,
            app_name,
            total_commands: commands.len(),
        });

        let result = self.run_commands(&mut commands);
        self.commands = Some(commands);

        if result.is_ok() {
            self.state.complete();
            info!("Setup completed successfully");
        }
        self.emit_event(RunnerEvent::RunFinished {
            run_id: self.state.run_id,
            status: self.state.status,
        });
        result
    }

    fn run_commands(&mut self, commands: &mut [Box<dyn Command>]) -> RunnerResult {
        for command in commands.iter_mut() {
            let name = command.name().to_string();
            let description = command.description();
            let span = info_span!("command", name = %name);
            let _guard = span.enter();

            if !command.can_execute() {
                info!("Skipping {} (prerequisites not met)", description);
                self.state.skipped.push(name.clone());
                self.emit_event(RunnerEvent::CommandSkipped { name, description });
                continue;
            }

            info!("Executing: {}", description);
            self.emit_event(RunnerEvent::CommandStarted {
                name: name.clone(),
                description: description.clone(),
            });

            let err = match command.execute() {
                Ok(()) => {
                    self.state.executed.push(name.clone());
                    self.emit_event(RunnerEvent::CommandCompleted { name, description });
                    continue;
                }
                Err(err) => err,
            };

            let message = err.to_string();
            match command.failure_policy() {
                FailurePolicy::Tolerate => {
                    warn!("Command {} failed, continuing: {}", description, message);
                    self.state.warned.push(name.clone());
                    self.emit_event(RunnerEvent::CommandWarned {
                        name,
                        description,
                        message,
                    });
                }
                FailurePolicy::Fatal => {
                    error!("Command {} failed: {}", description, message);
                    self.state.fail(&name);
                    self.emit_event(RunnerEvent::CommandFailed {
                        name,
                        description: description.clone(),
                        message: message.clone(),
                    });
                    return Err(RunnerError::CommandFailed {
                        description,
                        message,
                    });
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("factory", &self.factory)
            .field("commands", &self.commands.as_ref().map(|c| c.len()))
            .field("state", &self.state.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{test_context, CommandRegistry};
    use crate::core::error::{CommandError, CommandResult};
    use crate::shell::MockShell;
    use parking_lot::Mutex;
    use std::path::Path;

    struct Probe {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fails: bool,
    }

    impl Command for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn execute(&mut self) -> CommandResult {
            self.log.lock().push(self.name.to_string());
            if self.fails {
                return Err(CommandError::Failed("boom".into()));
            }
            Ok(())
        }
    }

    fn runner() -> Runner {
        let ctx = test_context(Path::new("/app"), &MockShell::new());
        Runner::new(CommandFactory::new(CommandRegistry::new(), ctx))
    }

    fn probe(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Box<dyn Command> {
        Box::new(Probe {
            name,
            log: log.clone(),
            fails: false,
        })
    }

    #[test]
    fn test_events_and_state() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut runner = runner();
        runner.add_command(probe("one", &log));
        runner.add_command(probe("two", &log));
        let sink = events.clone();
        runner.add_event_handler(move |event| sink.lock().push(event));

        runner.run().unwrap();

        assert_eq!(*log.lock(), vec!["one", "two"]);
        assert_eq!(runner.state().status, RunStatus::Completed);
        assert_eq!(runner.state().executed, vec!["one", "two"]);
        assert_eq!(runner.state().progress(), 1.0);

        let events = events.lock();
        assert!(matches!(events[0], RunnerEvent::RunStarted { total_commands: 2, .. }));
        assert!(matches!(
            events.last(),
            Some(RunnerEvent::RunFinished { status: RunStatus::Completed, .. })
        ));
    }

    #[test]
    fn test_second_run_rejected() {
        let mut runner = runner();
        runner.run().unwrap();
        assert!(matches!(runner.run(), Err(RunnerError::AlreadyRun)));
    }

    #[test]
    fn test_fatal_failure_message() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut runner = runner();
        runner.add_command(Box::new(Probe {
            name: "database",
            log: log.clone(),
            fails: true,
        }));
        runner.add_command(probe("git", &log));

        let err = runner.run().unwrap_err();
        assert_eq!(err.to_string(), "Database failed: boom");
        assert_eq!(runner.state().failed.as_deref(), Some("database"));
        assert_eq!(*log.lock(), vec!["database"]);
        assert_eq!(runner.command_names(), vec!["database", "git"]);
    }
}
