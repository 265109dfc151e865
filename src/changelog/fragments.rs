use super::ChangelogSettings;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

static UNRELEASED_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^## \[[^\]]*\] - Unreleased\s*$").expect("valid regex"));

static RELEASED_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^## \[[^\]]*\] - \d{4}-\d{2}-\d{2}").expect("valid regex"));

/// A fragment file and what its name says about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub path: PathBuf,
    /// First dot-separated segment of the file name, as written
    pub candidate: String,
    /// Canonical section when `candidate` is recognized
    pub section: Option<String>,
    /// Remainder of the file name, for listings
    pub summary: String,
}

impl Fragment {
    fn from_path(path: PathBuf, settings: &ChangelogSettings) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let stem = name.strip_suffix(".md")?;
        let (candidate, summary) = match stem.split_once('.') {
            Some((candidate, summary)) => (candidate.to_string(), summary.to_string()),
            None => (stem.to_string(), String::new()),
        };
        let section = settings.canonical_section(&candidate).map(str::to_string);
        Some(Self {
            path,
            candidate,
            section,
            summary,
        })
    }
}

/// Outcome of a merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// The changelog was rewritten
    pub changelog_updated: bool,
    /// Fragments whose content went into the changelog
    pub merged: Vec<PathBuf>,
    /// Fragments deleted from disk
    pub consumed: Vec<PathBuf>,
    /// Fragments with an unrecognized section, left in place
    pub skipped: Vec<PathBuf>,
}

/// Folds fragment files into a changelog's `Unreleased` section
#[derive(Debug, Clone, Default)]
pub struct FragmentMerger {
    settings: ChangelogSettings,
}

impl FragmentMerger {
    pub fn new(settings: ChangelogSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ChangelogSettings {
        &self.settings
    }

    /// Every `*.md` file in `dir`, sorted by file name
    pub fn list_fragments(&self, dir: &Path) -> Result<Vec<Fragment>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read fragments directory: {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths
            .into_iter()
            .filter_map(|path| Fragment::from_path(path, &self.settings))
            .collect())
    }

    /// Merge fragments from `dir` into `changelog`; returns whether the changelog changed
    pub fn merge(&self, changelog: &Path, dir: &Path) -> Result<bool> {
        Ok(self.merge_with_report(changelog, dir)?.changelog_updated)
    }

    pub fn merge_with_report(&self, changelog: &Path, dir: &Path) -> Result<MergeReport> {
        let mut report = MergeReport::default();
        if !self.settings.enabled || !dir.is_dir() {
            debug!("Changelog fragments disabled or {} missing", dir.display());
            return Ok(report);
        }

        let mut matched = Vec::new();
        let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
        for fragment in self.list_fragments(dir)? {
            let Some(section) = fragment.section else {
                warn!(
                    "Skipping fragment {} (unknown section '{}')",
                    fragment.path.display(),
                    fragment.candidate
                );
                report.skipped.push(fragment.path);
                continue;
            };
            let body = std::fs::read_to_string(&fragment.path)
                .with_context(|| format!("Failed to read fragment: {}", fragment.path.display()))?;
            let body = body.trim();
            if !body.is_empty() {
                grouped.entry(section).or_default().push(body.to_string());
                report.merged.push(fragment.path.clone());
            }
            matched.push(fragment.path);
        }

        let ordered: Vec<(String, Vec<String>)> = self
            .settings
            .sections
            .iter()
            .filter_map(|section| grouped.remove(section).map(|bodies| (section.clone(), bodies)))
            .collect();

        if ordered.is_empty() {
            report.consumed = consume(matched)?;
            return Ok(report);
        }

        let content = std::fs::read_to_string(changelog)
            .with_context(|| format!("Failed to read changelog: {}", changelog.display()))?;
        let Some(updated) = splice(&content, &ordered) else {
            info!("No Unreleased section in {}, leaving fragments in place", changelog.display());
            report.merged.clear();
            return Ok(report);
        };

        std::fs::write(changelog, updated)
            .with_context(|| format!("Failed to write changelog: {}", changelog.display()))?;
        report.changelog_updated = true;
        report.consumed = consume(matched)?;
        info!(
            "Merged {} changelog fragment(s) into {}",
            report.merged.len(),
            changelog.display()
        );
        Ok(report)
    }
}

fn consume(paths: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    for path in &paths {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to delete fragment: {}", path.display()))?;
    }
    Ok(paths)
}

fn bullet(line: &str) -> String {
    if line.starts_with("- ") || line.starts_with("* ") {
        line.to_string()
    } else {
        format!("- {}", line)
    }
}

fn render_block(sections: &[(String, Vec<String>)]) -> Vec<String> {
    let mut lines = Vec::new();
    for (section, bodies) in sections {
        let bullets: Vec<String> = bodies
            .iter()
            .flat_map(|body| body.lines())
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(bullet)
            .collect();
        if bullets.is_empty() {
            continue;
        }
        lines.push(format!("### {}", section));
        lines.push(String::new());
        lines.extend(bullets);
        lines.push(String::new());
    }
    lines
}

/// Insert grouped fragment bodies into `content` under its `Unreleased` heading.
///
/// Only the inserted block is new; every other byte of `content` is kept,
/// including its line endings. Returns `None` when there is nothing to insert
/// or no `Unreleased` heading.
pub fn splice(content: &str, sections: &[(String, Vec<String>)]) -> Option<String> {
    let block = render_block(sections);
    if block.is_empty() {
        return None;
    }

    // (byte offset, line text without its terminator)
    let mut lines: Vec<(usize, &str)> = Vec::new();
    let mut offset = 0;
    for raw in content.split_inclusive('\n') {
        lines.push((offset, raw.trim_end_matches(|c: char| c == '\n' || c == '\r')));
        offset += raw.len();
    }

    let start = lines
        .iter()
        .position(|(_, line)| UNRELEASED_HEADING.is_match(line))?;
    let boundary = lines[start + 1..]
        .iter()
        .position(|(_, line)| RELEASED_HEADING.is_match(line))
        .map(|index| start + 1 + index);
    let eol = if content.contains("\r\n") { "\r\n" } else { "\n" };

    let mut insert = String::new();
    match boundary {
        Some(index) => {
            let (at, _) = lines[index];
            if !lines[index - 1].1.trim().is_empty() {
                insert.push_str(eol);
            }
            for line in &block {
                insert.push_str(line);
                insert.push_str(eol);
            }
            Some(format!("{}{}{}", &content[..at], insert, &content[at..]))
        }
        None => {
            let terminated = content.ends_with('\n');
            if !terminated {
                insert.push_str(eol);
            }
            if lines.last().is_some_and(|(_, line)| !line.trim().is_empty()) {
                insert.push_str(eol);
            }
            insert.push_str(&block[..block.len() - 1].join(eol));
            if terminated {
                insert.push_str(eol);
            }
            Some(format!("{}{}", content, insert))
        }
    }
}
