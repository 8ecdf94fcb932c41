//! Lookup of precompiled wheels by runtime, package name and exact version.
//!
//! A hit lets the pip protocol install a binary package directly instead of
//! building it from source on the bundling host.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Capability to find a precompiled wheel for `(runtime, name, version)`.
///
/// Names are compared case-insensitively; versions must match exactly.
/// The returned location is anything `pip install` accepts (path or URL).
pub trait WheelIndex: Send + Sync {
    fn find(&self, runtime: &str, name: &str, version: &str) -> Option<String>;
}

impl<T: WheelIndex + ?Sized> WheelIndex for Box<T> {
    fn find(&self, runtime: &str, name: &str, version: &str) -> Option<String> {
        (**self).find(runtime, name, version)
    }
}

/// Canonical form of a package name: lowercase, with `-` and `.` folded to `_`
/// as in wheel file names.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '-' | '.' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// In-memory table of wheel locations, for callers that already know where
/// their wheels live. The CLI uses [`LocalWheelIndex`].
#[derive(Debug, Clone, Default)]
pub struct StaticWheelIndex {
    entries: HashMap<(String, String, String), String>,
}

impl StaticWheelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(
        mut self,
        runtime: &str,
        name: &str,
        version: &str,
        location: impl Into<String>,
    ) -> Self {
        self.insert(runtime, name, version, location);
        self
    }

    pub fn insert(&mut self, runtime: &str, name: &str, version: &str, location: impl Into<String>) {
        self.entries.insert(
            (runtime.to_owned(), normalize_name(name), version.to_owned()),
            location.into(),
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl WheelIndex for StaticWheelIndex {
    fn find(&self, runtime: &str, name: &str, version: &str) -> Option<String> {
        self.entries
            .get(&(runtime.to_owned(), normalize_name(name), version.to_owned()))
            .cloned()
    }
}

/// A parsed `{name}-{version}(-{build})?-{python}-{abi}-{platform}.whl` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelFile {
    pub path: PathBuf,
    pub name: String,
    pub version: String,
    pub python_tags: Vec<String>,
    pub platform_tags: Vec<String>,
}

impl WheelFile {
    pub fn parse(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let stem = file_name.strip_suffix(".whl")?;
        let parts: Vec<&str> = stem.split('-').collect();
        let (name, version, python, platform) = match parts.as_slice() {
            [name, version, python, _abi, platform] => (name, version, python, platform),
            [name, version, _build, python, _abi, platform] => (name, version, python, platform),
            _ => return None,
        };
        Some(Self {
            path: path.to_path_buf(),
            name: normalize_name(name),
            version: (*version).to_owned(),
            python_tags: python.split('.').map(str::to_owned).collect(),
            platform_tags: platform.split('.').map(str::to_owned).collect(),
        })
    }

    /// Whether this wheel can run on `runtime` on a Linux function host.
    pub fn is_compatible(&self, runtime: &Runtime) -> bool {
        let accepted = runtime.python_tags();
        let python_ok = self.python_tags.iter().any(|t| accepted.contains(t));
        let platform_ok = self
            .platform_tags
            .iter()
            .any(|p| p == "any" || p.contains("linux"));
        python_ok && platform_ok
    }
}

/// Wheels found in a local cache directory.
#[derive(Debug, Clone, Default)]
pub struct LocalWheelIndex {
    wheels: Vec<WheelFile>,
}

impl LocalWheelIndex {
    /// Scan `dir` for `.whl` files. A missing directory yields an empty index.
    pub fn scan(dir: &Path) -> std::io::Result<Self> {
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "wheel cache directory not found");
            return Ok(Self::default());
        }
        let mut wheels = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            match WheelFile::parse(&path) {
                Some(wheel) => wheels.push(wheel),
                None => tracing::trace!(path = %path.display(), "not a wheel file"),
            }
        }
        wheels.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(dir = %dir.display(), wheels = wheels.len(), "scanned wheel cache");
        Ok(Self { wheels })
    }

    pub fn wheels(&self) -> &[WheelFile] {
        &self.wheels
    }
}

impl WheelIndex for LocalWheelIndex {
    fn find(&self, runtime: &str, name: &str, version: &str) -> Option<String> {
        // arch-lint: allow(no-silent-result-drop) reason="an unknown runtime has no cached wheels"
        let runtime = Runtime::parse(runtime).ok()?;
        let name = normalize_name(name);
        self.wheels
            .iter()
            .find(|w| w.name == name && w.version == version && w.is_compatible(&runtime))
            .map(|w| w.path.display().to_string())
    }
}
