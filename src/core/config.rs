//! Setup configuration from YAML

use crate::changelog::ChangelogSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Default location of the setup configuration, relative to the app root
pub const DEFAULT_CONFIG_PATH: &str = "config/setup.yml";

/// Top-level setup configuration loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Application name, used in log and console output
    pub app_name: String,

    /// Database service settings
    pub database: DatabaseConfig,

    /// Redis service settings
    pub redis: RedisConfig,

    /// Service names the application depends on
    pub services: Vec<String>,

    /// Ordered step names to run. Empty runs every registered command.
    pub steps: Vec<String>,

    /// Operator-declared shell commands appended after the built-in steps
    pub custom_steps: Vec<CustomStepConfig>,

    /// Environment bootstrap steps run before the main pipeline
    pub pre_steps: Vec<PreStepConfig>,

    /// Seed the development database with `SEED_DEV_ENV=true`
    pub seed_env: bool,

    /// Extra `git config --local` pairs
    pub git_config: BTreeMap<String, String>,

    /// Changelog fragment settings
    pub changelog: ChangelogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub port: u16,
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub port: u16,
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
}

/// A custom step: a shell string with an optional guard condition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomStepConfig {
    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Expression evaluated by the condition evaluator; absent means always run
    #[serde(default)]
    pub condition: Option<String>,
}

/// A pre-step is either a built-in name or an inline custom step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreStepConfig {
    Named(String),
    Custom(CustomStepConfig),
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            app_name: "Application".to_string(),
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            services: Vec::new(),
            steps: Vec::new(),
            custom_steps: Vec::new(),
            pre_steps: Vec::new(),
            seed_env: false,
            git_config: BTreeMap::new(),
            changelog: ChangelogSettings::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            port: 5432,
            name: "db-app".to_string(),
            version: "14".to_string(),
            password: "postgres".to_string(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            port: 6379,
            name: "redis-app".to_string(),
            version: "latest".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Database name derived from the container name (`db-app` -> `app`)
    pub fn database_name(&self) -> String {
        self.name
            .strip_prefix("db-")
            .unwrap_or(&self.name)
            .to_string()
    }
}

impl CustomStepConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

impl Configuration {
    /// Load configuration from a YAML file.
    ///
    /// A missing file is an error naming the path; an empty file yields defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid configuration file {}", path.display()))
    }

    /// Like [`Configuration::from_file`], but an absent file yields defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_yaml::from_str(yaml)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        let config: Configuration = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.port == 0 {
            anyhow::bail!("database.port must be non-zero");
        }
        if self.redis.port == 0 {
            anyhow::bail!("redis.port must be non-zero");
        }

        for (index, step) in self.custom_steps.iter().enumerate() {
            if step.command.trim().is_empty() {
                anyhow::bail!("custom_steps[{}] is missing a command", index);
            }
        }

        for (index, step) in self.pre_steps.iter().enumerate() {
            match step {
                PreStepConfig::Named(name) if name.trim().is_empty() => {
                    anyhow::bail!("pre_steps[{}] has an empty name", index);
                }
                PreStepConfig::Custom(custom) if custom.command.trim().is_empty() => {
                    anyhow::bail!("pre_steps[{}] is missing a command", index);
                }
                _ => {}
            }
        }

        self.changelog.validate()?;
        Ok(())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {:?}",
            other
        ))),
    }
}

/// Names that appear more than once (case-insensitive), in first-seen order
pub(crate) fn duplicate_names<'a>(names: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for name in names {
        let key = name.to_lowercase();
        if !seen.insert(key) && !duplicates.contains(name) {
            duplicates.push(name.clone());
        }
    }
    duplicates
}
