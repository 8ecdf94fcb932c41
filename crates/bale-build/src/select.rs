use std::path::{Path, PathBuf};

use bale_core::IgnoreRules;
use globset::{GlobBuilder, GlobMatcher};
use indexmap::IndexMap;
use walkdir::{DirEntry, WalkDir};

use crate::paths::is_glob;

/// Include pattern used when a selector is given none.
pub const DEFAULT_INCLUDE: &str = "**";

/// A file chosen for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub absolute_path: PathBuf,
    /// Path relative to the mapping's base (or to the named directory).
    pub relative_path: String,
    /// Destination inside the archive. Unique within a bundle.
    pub archive_target: String,
}

/// A file matched by a [`FileSelector`], before an archive target is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    pub absolute: PathBuf,
    pub relative: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("invalid include pattern '{pattern}'")]
    InvalidPattern {
        pattern: String,
        source: globset::Error,
    },
    #[error("failed to walk {path}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// Enumerates regular files under a base directory that match include
/// patterns and survive ignore rules.
///
/// Calling [`select`](Self::select) re-walks the filesystem each time.
pub struct FileSelector<'a> {
    base_dir: PathBuf,
    includes: Vec<String>,
    ignore: &'a IgnoreRules,
}

impl<'a> FileSelector<'a> {
    pub fn new<I, S>(base_dir: impl Into<PathBuf>, includes: I, ignore: &'a IgnoreRules) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut includes: Vec<String> = includes.into_iter().map(Into::into).collect();
        if includes.is_empty() {
            includes.push(DEFAULT_INCLUDE.to_owned());
        }
        Self {
            base_dir: base_dir.into(),
            includes,
            ignore,
        }
    }

    /// Files matched by the include patterns, in pattern order.
    ///
    /// When two patterns yield the same relative path the later one wins,
    /// keeping the position of the first occurrence.
    pub fn select(&self) -> Result<Vec<MatchedFile>, SelectError> {
        let mut found: IndexMap<String, PathBuf> = IndexMap::new();
        for pattern in &self.includes {
            let matches = if is_glob(pattern) {
                self.expand_glob(pattern)?
            } else {
                self.expand_literal(pattern)?
            };
            for m in matches {
                found.insert(m.relative, m.absolute);
            }
        }
        tracing::debug!(
            base = %self.base_dir.display(),
            files = found.len(),
            "selected files"
        );
        Ok(found
            .into_iter()
            .map(|(relative, absolute)| MatchedFile { absolute, relative })
            .collect())
    }

    /// A literal directory yields its contents; a literal file yields itself
    /// under its basename. Ignore rules see the yielded relative path.
    fn expand_literal(&self, pattern: &str) -> Result<Vec<MatchedFile>, SelectError> {
        let path = if pattern.is_empty() {
            self.base_dir.clone()
        } else {
            self.base_dir.join(pattern)
        };
        // arch-lint: allow(no-error-swallowing) reason="a source that does not exist selects nothing"
        let Ok(metadata) = std::fs::symlink_metadata(&path) else {
            tracing::debug!(path = %path.display(), "mapping source not found");
            return Ok(Vec::new());
        };

        if metadata.is_dir() {
            return self.walk(&path, &path, |_| true);
        }
        if !metadata.is_file() {
            return Ok(Vec::new());
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Ok(Vec::new());
        };
        if self.ignore.is_ignored(&name) {
            return Ok(Vec::new());
        }
        Ok(vec![MatchedFile {
            absolute: path,
            relative: name,
        }])
    }

    fn expand_glob(&self, pattern: &str) -> Result<Vec<MatchedFile>, SelectError> {
        let matcher = compile(pattern)?;
        let prefix: Vec<&str> = pattern
            .split('/')
            .take_while(|segment| !is_glob(segment))
            .collect();
        let root = self.base_dir.join(prefix.join("/"));
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        self.walk(&root, &self.base_dir, |relative| matcher.is_match(relative))
    }

    /// Walk `root`, yielding regular files whose path relative to `relative_to`
    /// passes `keep` and the ignore rules. Ignored directories are pruned.
    fn walk(
        &self,
        root: &Path,
        relative_to: &Path,
        keep: impl Fn(&str) -> bool,
    ) -> Result<Vec<MatchedFile>, SelectError> {
        let not_ignored = |entry: &DirEntry| {
            entry.depth() == 0
                || relative_slash(entry.path(), relative_to)
                    .is_none_or(|rel| !self.ignore.is_ignored(&rel))
        };

        let mut out = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(not_ignored)
        {
            let entry = entry.map_err(|e| SelectError::Walk {
                path: root.to_path_buf(),
                source: e,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = relative_slash(entry.path(), relative_to) else {
                continue;
            };
            if keep(&relative) {
                out.push(MatchedFile {
                    absolute: entry.into_path(),
                    relative,
                });
            }
        }
        Ok(out)
    }
}

fn compile(pattern: &str) -> Result<GlobMatcher, SelectError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| SelectError::InvalidPattern {
            pattern: pattern.to_owned(),
            source: e,
        })
}

fn relative_slash(path: &Path, base: &Path) -> Option<String> {
    // arch-lint: allow(no-silent-result-drop) reason="walk entries outside the base are skipped"
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, rel).unwrap();
    }

    fn relatives(files: &[MatchedFile]) -> Vec<&str> {
        files.iter().map(|f| f.relative.as_str()).collect()
    }

    fn tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        for rel in ["a/aa.txt", "a/ab.txt", "b/ba.txt", "c.txt", "a/deep/x.pyc"] {
            touch(tmp.path(), rel);
        }
        tmp
    }

    #[test]
    fn default_include_is_everything() {
        let tmp = tree();
        let none = IgnoreRules::default();
        let selector = FileSelector::new(tmp.path(), Vec::<String>::new(), &none);
        assert_eq!(
            relatives(&selector.select().unwrap()),
            ["a/aa.txt", "a/ab.txt", "a/deep/x.pyc", "b/ba.txt", "c.txt"]
        );
    }

    #[test]
    fn literal_directory_yields_contents() {
        let tmp = tree();
        let none = IgnoreRules::default();
        let selected = FileSelector::new(tmp.path(), ["a"], &none).select().unwrap();
        assert_eq!(relatives(&selected), ["aa.txt", "ab.txt", "deep/x.pyc"]);
        assert_eq!(selected[0].absolute, tmp.path().join("a/aa.txt"));
    }

    #[test]
    fn literal_file_yields_basename() {
        let tmp = tree();
        let none = IgnoreRules::default();
        let selected = FileSelector::new(tmp.path(), ["b/ba.txt"], &none).select().unwrap();
        assert_eq!(relatives(&selected), ["ba.txt"]);
    }

    #[test]
    fn missing_literal_yields_nothing() {
        let tmp = tree();
        let none = IgnoreRules::default();
        let selected = FileSelector::new(tmp.path(), ["nope"], &none).select().unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn star_does_not_cross_directories() {
        let tmp = tree();
        let none = IgnoreRules::default();
        let selected = FileSelector::new(tmp.path(), ["a/*"], &none).select().unwrap();
        assert_eq!(relatives(&selected), ["a/aa.txt", "a/ab.txt"]);
    }

    #[test]
    fn double_star_recurses() {
        let tmp = tree();
        let none = IgnoreRules::default();
        let selected = FileSelector::new(tmp.path(), ["a/**"], &none).select().unwrap();
        assert_eq!(relatives(&selected), ["a/aa.txt", "a/ab.txt", "a/deep/x.pyc"]);
    }

    #[test]
    fn ignore_wins_and_prunes() {
        let tmp = tree();
        let ignore = IgnoreRules::new(["*.pyc", "b", "ab.txt"]).unwrap();
        let selected = FileSelector::new(tmp.path(), ["**", "a/ab.txt"], &ignore)
            .select()
            .unwrap();
        assert_eq!(relatives(&selected), ["a/aa.txt", "c.txt"]);
    }

    #[test]
    fn later_pattern_wins_keeping_first_position() {
        let tmp = tree();
        touch(tmp.path(), "b/c.txt");
        let none = IgnoreRules::default();
        let selected = FileSelector::new(tmp.path(), ["c.txt", "a/aa.txt", "b/c.txt"], &none)
            .select()
            .unwrap();
        assert_eq!(relatives(&selected), ["c.txt", "aa.txt"]);
        assert_eq!(selected[0].absolute, tmp.path().join("b/c.txt"));
    }

    #[test]
    fn select_is_repeatable() {
        let tmp = tree();
        let none = IgnoreRules::default();
        let selector = FileSelector::new(tmp.path(), ["**"], &none);
        assert_eq!(selector.select().unwrap(), selector.select().unwrap());

        touch(tmp.path(), "d.txt");
        assert!(relatives(&selector.select().unwrap()).contains(&"d.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let tmp = tree();
        std::os::unix::fs::symlink(tmp.path().join("c.txt"), tmp.path().join("link.txt")).unwrap();
        let none = IgnoreRules::default();
        let selected = FileSelector::new(tmp.path(), ["**"], &none).select().unwrap();
        assert!(!relatives(&selected).contains(&"link.txt"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let tmp = tree();
        let none = IgnoreRules::default();
        let err = FileSelector::new(tmp.path(), ["a/[z"], &none).select().unwrap_err();
        assert!(matches!(err, SelectError::InvalidPattern { .. }));
    }
}
