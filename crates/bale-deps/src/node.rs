//! npm-based dependency vendoring for Node.js runtimes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use bale_core::{CachePolicy, PathMapping};

use crate::error::{DependencyError, Result};
use crate::executor::{ToolCommand, ToolExecutor};
use crate::resolver::{DependencyResolver, DependencySpec, mapping_source, remove_dir_if_exists};
use crate::runtime::Runtime;
use crate::wheels::WheelIndex;

pub const PACKAGE_MANIFEST: &str = "package.json";

pub const NODE_MODULES: &str = "node_modules";

/// Root of the per-runtime node environments, relative to the project.
pub const NODEENV_DIR: &str = ".bale/nodeenv";

/// Node environment directory for `runtime` inside `project_dir`.
pub fn nodeenv_dir(project_dir: &Path, runtime: &Runtime) -> PathBuf {
    project_dir.join(NODEENV_DIR).join(runtime.identifier())
}

fn env_bin(env: &Path) -> PathBuf {
    env.join("bin")
}

/// `PATH` with `bin` in front of the inherited entries.
fn search_path(bin: &Path) -> Result<OsString> {
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let entries = std::iter::once(bin.to_path_buf()).chain(std::env::split_paths(&inherited));
    std::env::join_paths(entries).map_err(|e| DependencyError::SearchPath {
        path: bin.to_path_buf(),
        source: e,
    })
}

/// Number of declared dependencies in a `package.json`.
pub fn declared_dependencies(manifest: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(manifest).map_err(|e| DependencyError::Io {
        action: "failed to read",
        path: manifest.to_path_buf(),
        source: e,
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| DependencyError::InvalidManifest {
            path: manifest.to_path_buf(),
            source: e,
        })?;
    let count: usize = ["dependencies", "optionalDependencies"]
        .iter()
        .filter_map(|key| value.get(key).and_then(serde_json::Value::as_object))
        .map(serde_json::Map::len)
        .sum();
    Ok(count)
}

impl<E: ToolExecutor, W: WheelIndex> DependencyResolver<E, W> {
    pub(crate) async fn resolve_node(
        &self,
        runtime: &Runtime,
        spec: &DependencySpec,
        project_dir: &Path,
    ) -> Result<Option<PathMapping>> {
        let env = nodeenv_dir(project_dir, runtime);
        let node_modules = project_dir.join(NODE_MODULES);

        if !spec.cache_policy.is_keep() {
            remove_dir_if_exists(&env)?;
            remove_dir_if_exists(&node_modules)?;
        }

        self.provision_nodeenv(runtime, &env, project_dir, spec.cache_policy)
            .await?;

        if !spec.manifest_path.is_file() {
            tracing::info!(
                manifest = %spec.manifest_path.display(),
                "no package manifest; skipping npm install"
            );
            return Ok(None);
        }

        let declared = declared_dependencies(&spec.manifest_path)?;
        tracing::info!(dependencies = declared, "installing node dependencies");
        self.npm_install(&env, project_dir).await?;

        Ok(Some(PathMapping::new(
            mapping_source(&node_modules, project_dir),
            NODE_MODULES,
        )))
    }

    /// Provision a Node.js environment at `env` with the version pinned for
    /// `runtime`. Reused as is under [`CachePolicy::Keep`] when it already
    /// contains npm.
    pub async fn provision_nodeenv(
        &self,
        runtime: &Runtime,
        env: &Path,
        project_dir: &Path,
        policy: CachePolicy,
    ) -> Result<()> {
        if policy.is_keep() && env_bin(env).join("npm").exists() {
            tracing::debug!(env = %env.display(), "reusing cached nodeenv");
            return Ok(());
        }

        let version = runtime
            .node_version()
            .ok_or_else(|| DependencyError::UnsupportedRuntime(runtime.identifier()))?;

        if let Some(parent) = env.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DependencyError::Io {
                action: "failed to create",
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let command = ToolCommand::new("nodeenv", project_dir)
            .arg(format!("--node={version}"))
            .args(["--prebuilt", "--force"])
            .arg(env.display().to_string());

        tracing::info!(env = %env.display(), node = version, "creating nodeenv");
        self.executor
            .exec(&command)
            .await
            .map_err(|e| DependencyError::EnvironmentProvisioning {
                path: env.to_path_buf(),
                source: e,
            })?;
        Ok(())
    }

    async fn npm_install(&self, env: &Path, project_dir: &Path) -> Result<()> {
        let bin = env_bin(env);
        let path = search_path(&bin)?;

        let command = ToolCommand::new(bin.join("npm"), project_dir)
            .arg("install")
            .env("PATH", path);
        self.executor
            .exec(&command)
            .await
            .map_err(DependencyError::installation)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_path_puts_env_bin_first() {
        let bin = Path::new("/project/.bale/nodeenv/nodejs20.x/bin");
        let path = search_path(bin).unwrap();
        let entries: Vec<PathBuf> = std::env::split_paths(&path).collect();
        assert_eq!(entries[0], bin);
    }

    #[cfg(unix)]
    #[test]
    fn search_path_rejects_separator_in_bin() {
        let err = search_path(Path::new("/odd:dir/bin")).unwrap_err();
        assert!(matches!(err, DependencyError::SearchPath { .. }));
    }

    #[test]
    fn counts_declared_dependencies() {
        let dir = tempfile::TempDir::new().unwrap();
        let manifest = dir.path().join("package.json");
        std::fs::write(
            &manifest,
            r#"{"name": "fn", "dependencies": {"1337": "^1.0.0", "left-pad": "1.3.0"}}"#,
        )
        .unwrap();
        assert_eq!(declared_dependencies(&manifest).unwrap(), 2);

        std::fs::write(&manifest, r#"{"name": "fn"}"#).unwrap();
        assert_eq!(declared_dependencies(&manifest).unwrap(), 0);
    }

    #[test]
    fn invalid_manifest_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let manifest = dir.path().join("package.json");
        std::fs::write(&manifest, "{ not json").unwrap();

        let err = declared_dependencies(&manifest).unwrap_err();
        assert!(matches!(err, DependencyError::InvalidManifest { .. }));
    }

    #[test]
    fn nodeenv_dir_is_runtime_scoped() {
        let rt = Runtime::parse("nodejs6.10").unwrap();
        assert_eq!(
            nodeenv_dir(Path::new("/p"), &rt),
            Path::new("/p/.bale/nodeenv/nodejs6.10")
        );
    }
}
