use serde::{Deserialize, Serialize};

/// A declarative `source → target` rule selecting files for a bundle.
///
/// `source` is an absolute path, a path relative to the project directory,
/// or a glob expression. `target` is the directory prefix inside the archive;
/// an empty target places the matched files at the archive root.
///
/// # Examples
///
/// ```
/// use bale_core::PathMapping;
///
/// let mapping = PathMapping::new("./impl", "impl");
/// assert_eq!(mapping.source, "./impl");
/// assert_eq!(mapping.target, "impl");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapping {
    pub source: String,
    #[serde(default)]
    pub target: String,
}

impl PathMapping {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Mapping that places the contents of `source` at the archive root.
    pub fn at_root(source: impl Into<String>) -> Self {
        Self::new(source, "")
    }
}

/// A synthetic archive member that does not exist on disk.
///
/// Artifacts bypass file selection and ignore rules and are written after
/// all selected files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub content: Vec<u8>,
    pub target: String,
    /// Unix permission bits (e.g. `0o644`). `None` keeps the container default.
    pub permission_bits: Option<u32>,
}

impl Artifact {
    pub fn new(target: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            target: target.into(),
            permission_bits: None,
        }
    }

    pub fn with_permissions(mut self, bits: u32) -> Self {
        self.permission_bits = Some(bits);
        self
    }
}

/// Whether isolated dependency environments survive between invocations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    /// Reuse previously provisioned environments and module caches.
    Keep,
    /// Delete environments and module caches before installing.
    #[default]
    Fresh,
}

impl CachePolicy {
    pub fn from_keep(keep: bool) -> Self {
        if keep { Self::Keep } else { Self::Fresh }
    }

    pub fn is_keep(self) -> bool {
        self == Self::Keep
    }
}

/// Appends `mapping` unless a mapping with the same source is already present.
///
/// Returns `true` when the mapping was added.
pub fn append_unique(mappings: &mut Vec<PathMapping>, mapping: PathMapping) -> bool {
    if mappings.iter().any(|m| m.source == mapping.source) {
        tracing::debug!(source = %mapping.source, "mapping already present; not appending");
        return false;
    }
    mappings.push(mapping);
    true
}
