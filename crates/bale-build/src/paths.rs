//! Turns a declarative [`PathMapping`] into a concrete base directory, a
//! pattern relative to it, and an archive prefix. No filesystem access.

use std::path::{Path, PathBuf};

use bale_core::PathMapping;

/// A mapping after path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMapping {
    /// Directory the pattern is evaluated against.
    pub base_dir: PathBuf,
    /// Slash-separated pattern relative to `base_dir`. Empty means
    /// `base_dir` itself.
    pub pattern: String,
    /// Archive directory prefix: empty, or ending with `/`.
    pub target_prefix: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("invalid mapping '{source_path}': {reason}")]
    InvalidMapping {
        source_path: String,
        reason: &'static str,
    },
}

impl MappingError {
    fn invalid(source_path: &str, reason: &'static str) -> Self {
        Self::InvalidMapping {
            source_path: source_path.to_owned(),
            reason,
        }
    }
}

/// Returns `true` if `s` contains glob metacharacters.
pub fn is_glob(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

/// Resolve `mapping` against `project_dir`.
///
/// - Relative sources are rooted at `project_dir`.
/// - Absolute literal paths resolve to their parent directory, with the final
///   component as the pattern.
/// - Absolute globs resolve to their longest literal leading directory.
///
/// # Examples
///
/// ```
/// use bale_build::paths::resolve;
/// use bale_core::PathMapping;
/// use std::path::Path;
///
/// let resolved = resolve(&PathMapping::new("./impl", "impl"), Path::new("/proj")).unwrap();
/// assert_eq!(resolved.base_dir, Path::new("/proj"));
/// assert_eq!(resolved.pattern, "impl");
/// assert_eq!(resolved.target_prefix, "impl/");
/// ```
pub fn resolve(mapping: &PathMapping, project_dir: &Path) -> Result<ResolvedMapping, MappingError> {
    let source = mapping.source.trim();
    if source.is_empty() {
        return Err(MappingError::invalid(&mapping.source, "source is empty"));
    }
    let target_prefix = normalize_target(&mapping.target)
        .ok_or_else(|| MappingError::invalid(&mapping.source, "target must not contain '..'"))?;

    let components = normalize_components(source)
        .ok_or_else(|| MappingError::invalid(source, "source escapes its base directory"))?;

    let (base_dir, pattern) = if Path::new(source).is_absolute() {
        let split = match components.iter().position(|c| is_glob(c)) {
            Some(first_glob) => first_glob,
            None => components.len().saturating_sub(1),
        };
        let mut base = PathBuf::from("/");
        base.extend(&components[..split]);
        (base, components[split..].join("/"))
    } else {
        (project_dir.to_path_buf(), components.join("/"))
    };

    Ok(ResolvedMapping {
        base_dir,
        pattern,
        target_prefix,
    })
}

/// Split a slash-separated path into components, dropping `.` and empty
/// segments and collapsing `..`. Returns `None` if `..` climbs above the start.
fn normalize_components(path: &str) -> Option<Vec<&str>> {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop()?;
            }
            other => out.push(other),
        }
    }
    Some(out)
}

/// `""`, `"."` and `"/"` mean the archive root; anything else becomes
/// `"dir/sub/"`.
fn normalize_target(target: &str) -> Option<String> {
    let mut parts = Vec::new();
    for segment in target.trim().split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        Some(String::new())
    } else {
        Some(format!("{}/", parts.join("/")))
    }
}
