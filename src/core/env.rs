//! Access to environment variables
//!
//! Prerequisite loading and some commands export variables for later steps.
//! Going through [`EnvStore`] keeps that testable without touching the
//! process environment.

use parking_lot::Mutex;
use std::collections::HashMap;

pub trait EnvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    /// Set `key` only when it is unset or empty; returns the effective value
    fn set_default(&self, key: &str, value: &str) -> String {
        match self.get(key) {
            Some(existing) if !existing.is_empty() => existing,
            _ => {
                self.set(key, value);
                value.to_string()
            }
        }
    }
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvStore for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn set(&self, key: &str, value: &str) {
        std::env::set_var(key, value);
    }
}

/// In-memory environment
#[derive(Debug, Default)]
pub struct MemoryEnv {
    vars: Mutex<HashMap<String, String>>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Mutex::new(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.vars.lock().clone()
    }
}

impl EnvStore for MemoryEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.vars.lock().insert(key.to_string(), value.to_string());
    }
}
