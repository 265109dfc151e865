//! Name to constructor registries
//!
//! [`Registry`] keeps entries in insertion order; re-registering a name
//! replaces its constructor in place. The process-wide command registry is
//! seeded from [`builtin_commands`] on first use.

use super::{
    asdf::AsdfCommand, brew::BrewCommand, bundler::BundlerCommand, config_files::ConfigCommand,
    database::DatabaseCommand, docker::DockerCommand, env::EnvCommand, git::GitCommand,
    pg_tools::PgToolsCommand, yarn::YarnCommand, Command, CommandContext,
};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

/// Builds a command for a run
pub type CommandConstructor = fn(&CommandContext) -> Box<dyn Command>;

/// Registry of setup commands
pub type CommandRegistry = Registry<CommandConstructor>;

/// Ordered registry of named entries
#[derive(Clone)]
pub struct Registry<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Clone> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `(name, entry)` pairs
    pub fn from_entries<N: Into<String>>(entries: impl IntoIterator<Item = (N, T)>) -> Self {
        let mut registry = Self::new();
        for (name, entry) in entries {
            registry.register(name, entry);
        }
        registry
    }

    /// Register `entry` under `name`, replacing any previous registration
    pub fn register(&mut self, name: impl Into<String>, entry: T) {
        let name = name.into();
        debug!("Registering {}", name);
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = entry,
            None => self.entries.push((name, entry)),
        }
    }

    pub fn get(&self, name: &str) -> Option<T> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, entry)| entry.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == name)
    }

    /// Every entry, in registration order
    pub fn all(&self) -> Vec<T> {
        self.entries.iter().map(|(_, entry)| entry.clone()).collect()
    }

    /// Every name, in registration order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn unregister(&mut self, name: &str) -> Option<T> {
        debug!("Unregistering {}", name);
        let index = self.entries.iter().position(|(existing, _)| existing == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn clear(&mut self) {
        debug!("Clearing registry");
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.entries.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .finish()
    }
}

/// Built-in commands in default execution order
pub fn builtin_commands() -> Vec<(&'static str, CommandConstructor)> {
    vec![
        ("brew", BrewCommand::boxed as CommandConstructor),
        ("asdf", AsdfCommand::boxed as CommandConstructor),
        ("bundler", BundlerCommand::boxed as CommandConstructor),
        ("yarn", YarnCommand::boxed as CommandConstructor),
        ("config", ConfigCommand::boxed as CommandConstructor),
        ("env", EnvCommand::boxed as CommandConstructor),
        ("docker", DockerCommand::boxed as CommandConstructor),
        ("database", DatabaseCommand::boxed as CommandConstructor),
        ("git", GitCommand::boxed as CommandConstructor),
        ("pg_tools", PgToolsCommand::boxed as CommandConstructor),
    ]
}

impl CommandRegistry {
    /// Registry holding only the built-in commands
    pub fn builtin() -> Self {
        Self::from_entries(builtin_commands())
    }
}

static GLOBAL: Lazy<RwLock<CommandRegistry>> = Lazy::new(|| RwLock::new(CommandRegistry::builtin()));

/// The process-wide command registry
pub fn global() -> &'static RwLock<CommandRegistry> {
    &GLOBAL
}

/// Register a command in the process-wide registry
pub fn register(name: impl Into<String>, constructor: CommandConstructor) {
    global().write().register(name, constructor);
}

/// Copy of the process-wide registry, for [`restore`]
pub fn snapshot() -> CommandRegistry {
    global().read().clone()
}

/// Replace the process-wide registry, typically with an earlier [`snapshot`]
pub fn restore(registry: CommandRegistry) {
    *global().write() = registry;
}
