//! Changelog fragments
//!
//! Pending changelog entries live as small files named
//! `<section>.<summary>.md` in a fragments directory. At release time they are
//! folded into the `Unreleased` section of the changelog and deleted.

mod fragments;

pub use fragments::{splice, Fragment, FragmentMerger, MergeReport};

use crate::core::config::duplicate_names;
use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FRAGMENT_DIR: &str = "changelog/unreleased";

pub const DEFAULT_SECTIONS: &[&str] = &["Added", "Changed", "Deprecated", "Removed", "Fixed", "Security"];

/// `changelog` block of the setup configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangelogSettings {
    /// Merge fragments at all
    pub enabled: bool,

    /// Fragments directory, relative to the app root
    pub directory: String,

    /// Recognized sections, in the order they are rendered
    pub sections: Vec<String>,
}

impl Default for ChangelogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: DEFAULT_FRAGMENT_DIR.to_string(),
            sections: DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ChangelogSettings {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.sections.is_empty() {
            anyhow::bail!("changelog.sections must not be empty");
        }
        if self.sections.iter().any(|s| s.trim().is_empty() || s.contains('.')) {
            anyhow::bail!("changelog.sections entries must be non-empty and contain no '.'");
        }
        let duplicates = duplicate_names(&self.sections);
        if !duplicates.is_empty() {
            anyhow::bail!("changelog.sections has duplicates: {}", duplicates.join(", "));
        }
        Ok(())
    }

    /// Canonical section for a fragment's candidate name, matched case-insensitively
    pub fn canonical_section(&self, candidate: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|section| section.eq_ignore_ascii_case(candidate))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ChangelogSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.directory, "changelog/unreleased");
        assert_eq!(settings.sections.len(), 6);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_canonical_section() {
        let settings = ChangelogSettings::default();
        assert_eq!(settings.canonical_section("added"), Some("Added"));
        assert_eq!(settings.canonical_section("SECURITY"), Some("Security"));
        assert_eq!(settings.canonical_section("Bogus"), None);
    }

    #[test]
    fn test_validate_rejects_duplicates_and_empty() {
        let settings = ChangelogSettings {
            sections: vec!["Added".into(), "ADDED".into()],
            ..ChangelogSettings::default()
        };
        assert!(settings.validate().unwrap_err().to_string().contains("ADDED"));

        let settings = ChangelogSettings {
            sections: Vec::new(),
            ..ChangelogSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_default_sections() {
        let settings: ChangelogSettings = serde_yaml::from_str("directory: doc/changes\n").unwrap();
        assert_eq!(settings.directory, "doc/changes");
        assert_eq!(settings.sections[0], "Added");
    }
}
