//! Ignore rules applied during file selection.
//!
//! A rule is a shell-style glob fragment. A relative path is ignored when a
//! rule matches the whole path, its basename, or one of its leading
//! directories. `*` crosses `/`, so `boto3*` ignores `boto3/__init__.py`.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Name of the per-project (and per-user) ignore file.
pub const IGNORE_FILE_NAME: &str = ".baleignore";

/// Ordered set of ignore fragments compiled into a single matcher.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    rules: Vec<String>,
    set: GlobSet,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            set: GlobSet::empty(),
        }
    }
}

impl IgnoreRules {
    /// Compile rules from in-memory fragments.
    pub fn new<I, S>(fragments: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        let mut builder = GlobSetBuilder::new();
        for fragment in fragments {
            let Some(rule) = normalize_fragment(fragment.as_ref()) else {
                continue;
            };
            let glob = Glob::new(&rule).map_err(|e| crate::Error::InvalidIgnoreRule {
                rule: rule.clone(),
                source: e,
            })?;
            builder.add(glob);
            rules.push(rule);
        }
        let set = builder
            .build()
            .map_err(|e| crate::Error::InvalidIgnoreRule {
                rule: rules.join(", "),
                source: e,
            })?;
        Ok(Self { rules, set })
    }

    /// Parse newline-delimited ignore file content. Blank lines and `#`
    /// comments are skipped.
    pub fn parse(content: &str) -> crate::Result<Self> {
        Self::new(content.lines().filter(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        }))
    }

    /// Load ignore rules for a project.
    ///
    /// Sources are concatenated in this order: `<home>/.baleignore`,
    /// `<project_dir>/.baleignore`, then `extra` (usually the `ignore` list
    /// from `bale.toml`). Missing files are skipped.
    pub fn load(project_dir: &Path, home: Option<&Path>, extra: &[String]) -> crate::Result<Self> {
        let mut fragments: Vec<String> = Vec::new();

        let candidates = home
            .map(|h| h.join(IGNORE_FILE_NAME))
            .into_iter()
            .chain(std::iter::once(project_dir.join(IGNORE_FILE_NAME)));

        for path in candidates {
            if !path.is_file() {
                continue;
            }
            let content =
                std::fs::read_to_string(&path).map_err(|e| crate::Error::IgnoreFileRead {
                    path: path.clone(),
                    source: e,
                })?;
            tracing::debug!(path = %path.display(), "loaded ignore file");
            fragments.extend(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_owned),
            );
        }
        fragments.extend(extra.iter().cloned());

        Self::new(fragments)
    }

    /// Returns `true` if the slash-separated relative path is excluded.
    pub fn is_ignored(&self, relative_path: &str) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let relative_path = relative_path.trim_start_matches("./");
        if self.set.is_match(relative_path) {
            return true;
        }
        if let Some((_, basename)) = relative_path.rsplit_once('/')
            && self.set.is_match(basename)
        {
            return true;
        }
        relative_path
            .match_indices('/')
            .any(|(idx, _)| self.set.is_match(&relative_path[..idx]))
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn normalize_fragment(fragment: &str) -> Option<String> {
    let trimmed = fragment.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
