use std::path::{Path, PathBuf};

use bale_core::{CachePolicy, PathMapping};

use crate::error::{DependencyError, Result};
use crate::executor::{RealExecutor, ToolExecutor};
use crate::node::PACKAGE_MANIFEST;
use crate::python::REQUIREMENTS_FILE;
use crate::runtime::Runtime;
use crate::wheels::{LocalWheelIndex, WheelIndex};

/// What to install for a function bundle and how to treat cached environments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub runtime: String,
    pub manifest_path: PathBuf,
    pub cache_policy: CachePolicy,
}

impl DependencySpec {
    /// Spec using the conventional manifest for `runtime` inside `project_dir`
    /// (`requirements.txt` for Python, `package.json` for Node.js).
    pub fn for_project(
        runtime: &str,
        project_dir: &Path,
        cache_policy: CachePolicy,
    ) -> Result<Self> {
        let manifest = match Runtime::parse(runtime)? {
            Runtime::Python { .. } => REQUIREMENTS_FILE,
            Runtime::Node { .. } => PACKAGE_MANIFEST,
        };
        Ok(Self {
            runtime: runtime.to_owned(),
            manifest_path: project_dir.join(manifest),
            cache_policy,
        })
    }
}

/// Installs third-party dependencies into isolated, project-local
/// environments, parameterized over the executor for testability.
///
/// The wheel index defaults to a [`LocalWheelIndex`] scanned from a wheel
/// cache directory; [`new`](Self::new) starts with no cached wheels.
pub struct DependencyResolver<E: ToolExecutor = RealExecutor, W: WheelIndex = LocalWheelIndex> {
    pub(crate) executor: E,
    pub(crate) wheels: W,
}

impl DependencyResolver<RealExecutor, LocalWheelIndex> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
            wheels: LocalWheelIndex::default(),
        }
    }

    /// Resolver backed by the wheels found in `cache_dir`.
    pub fn with_wheel_cache(cache_dir: &Path) -> Result<Self> {
        let wheels = LocalWheelIndex::scan(cache_dir).map_err(|e| DependencyError::Io {
            action: "failed to scan wheel cache",
            path: cache_dir.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            executor: RealExecutor,
            wheels,
        })
    }
}

impl Default for DependencyResolver<RealExecutor, LocalWheelIndex> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ToolExecutor, W: WheelIndex> DependencyResolver<E, W> {
    pub fn with_executor(executor: E, wheels: W) -> Self {
        Self { executor, wheels }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Install the dependencies described by `spec`.
    ///
    /// Returns the mapping that adds the installed packages to the bundle, or
    /// `None` when nothing had to be installed.
    pub async fn resolve(
        &self,
        spec: &DependencySpec,
        project_dir: &Path,
    ) -> Result<Option<PathMapping>> {
        let runtime = Runtime::parse(&spec.runtime)?;
        tracing::debug!(
            runtime = %runtime,
            manifest = %spec.manifest_path.display(),
            policy = ?spec.cache_policy,
            "resolving dependencies"
        );
        match runtime {
            Runtime::Python { .. } => self.resolve_python(&runtime, spec, project_dir).await,
            Runtime::Node { .. } => self.resolve_node(&runtime, spec, project_dir).await,
        }
    }
}

/// Remove a directory tree, treating "not found" as success.
pub(crate) fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed cached environment");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DependencyError::Io {
            action: "failed to remove",
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Mapping source for `path`, relative to `project_dir` when possible.
pub(crate) fn mapping_source(path: &Path, project_dir: &Path) -> String {
    path.strip_prefix(project_dir)
        // arch-lint: allow(no-silent-result-drop) reason="paths outside the project stay absolute"
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
