//! pip-based dependency vendoring for Python runtimes.
//!
//! ```text
//! requirements.txt ── blank / comments only? ── yes ──▶ skip
//!        │ no
//!        ▼
//! .bale/venv/<runtime>   (removed first unless cache policy is keep)
//!        │
//!        ├─ exact pins with a cached wheel ──▶ <wheel>...
//!        └─ everything else               ──▶ -r <requirements>
//!        │
//!        ▼
//! pip install <wheel>... [-r <requirements>]
//!        │
//!        ▼
//! site-packages mapped to the archive root
//! ```

use std::path::{Path, PathBuf};

use bale_core::{CachePolicy, PathMapping};

use crate::error::{DependencyError, Result};
use crate::executor::{ToolCommand, ToolExecutor};
use crate::resolver::{DependencyResolver, DependencySpec, mapping_source, remove_dir_if_exists};
use crate::runtime::Runtime;
use crate::wheels::WheelIndex;

pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Root of the per-runtime virtual environments, relative to the project.
pub const VENV_DIR: &str = ".bale/venv";

/// Requirements left for pip after cached wheels were taken out.
const REMAINING_REQUIREMENTS_FILE: &str = "bale-requirements.txt";

/// Requirement-file options whose argument is a path relative to the file.
const INCLUDE_OPTIONS: [&str; 4] = ["--requirement", "--constraint", "-r", "-c"];

/// One non-blank, non-comment line of a requirements file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub line: String,
    /// Set for exact `name==version` pins without markers.
    pub pin: Option<Pin>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    pub name: String,
    pub version: String,
}

/// What an install run did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Packages installed from cached wheels.
    pub cached: Vec<String>,
    /// Requirement lines handed to pip.
    pub from_source: Vec<String>,
}

pub fn parse_requirements(content: &str) -> Vec<Requirement> {
    content
        .lines()
        .filter_map(|raw| {
            let line = strip_inline_comment(raw).trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            Some(Requirement {
                line: line.to_owned(),
                pin: parse_pin(line),
            })
        })
        .collect()
}

fn strip_inline_comment(line: &str) -> &str {
    match line.find(" #") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_pin(line: &str) -> Option<Pin> {
    if line.starts_with('-') || line.contains(';') || line.contains("://") {
        return None;
    }
    let (name, version) = line.split_once("==")?;
    let name = name.split('[').next().unwrap_or_default().trim();
    let version = version.trim();

    let name_ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    let version_ok = !version.is_empty()
        && !version.starts_with('=')
        && !version.contains(|c: char| matches!(c, ',' | '*' | ' ' | '<' | '>' | '!' | '~'));

    (name_ok && version_ok).then(|| Pin {
        name: name.to_owned(),
        version: version.to_owned(),
    })
}

/// Rewrite a relative `-r`/`-c` include so it still resolves once the line
/// is moved out of the directory `base`. Other lines are returned unchanged.
fn rebase_include(line: &str, base: &Path) -> String {
    for option in INCLUDE_OPTIONS {
        let Some(rest) = line.strip_prefix(option) else {
            continue;
        };
        let target = rest.trim_start_matches([' ', '\t', '=']).trim();
        if target.is_empty() || target.contains("://") || Path::new(target).is_absolute() {
            return line.to_owned();
        }
        return format!("{option} {}", base.join(target).display());
    }
    line.to_owned()
}

/// `true` if `path` exists and has at least one line that is neither blank
/// nor a comment. This is a best-effort check.
pub fn has_at_least_one_package(path: &Path) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let content = std::fs::read_to_string(path).map_err(|e| DependencyError::Io {
        action: "failed to read",
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(!parse_requirements(&content).is_empty())
}

/// Virtual environment directory for `runtime` inside `project_dir`.
pub fn venv_dir(project_dir: &Path, runtime: &Runtime) -> PathBuf {
    project_dir.join(VENV_DIR).join(runtime.identifier())
}

/// Locate `lib/python*/site-packages` inside a virtual environment.
pub fn site_packages_dir(venv: &Path) -> Option<PathBuf> {
    let lib = venv.join("lib");
    // arch-lint: allow(no-silent-result-drop) reason="a missing or unreadable lib dir means no site-packages"
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(&lib)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("python"))
        .map(|entry| entry.path().join("site-packages"))
        .filter(|p| p.is_dir())
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

fn venv_pip(venv: &Path) -> PathBuf {
    venv.join("bin").join("pip")
}

impl<E: ToolExecutor, W: WheelIndex> DependencyResolver<E, W> {
    pub(crate) async fn resolve_python(
        &self,
        runtime: &Runtime,
        spec: &DependencySpec,
        project_dir: &Path,
    ) -> Result<Option<PathMapping>> {
        if !has_at_least_one_package(&spec.manifest_path)? {
            tracing::info!(
                manifest = %spec.manifest_path.display(),
                "no requirements declared; skipping pip install"
            );
            return Ok(None);
        }

        let venv = venv_dir(project_dir, runtime);
        self.provision_virtualenv(runtime, &venv, project_dir, spec.cache_policy)
            .await?;

        let report = self
            .install_requirements(runtime, &venv, &spec.manifest_path, project_dir)
            .await?;
        tracing::info!(
            cached = report.cached.len(),
            from_source = report.from_source.len(),
            "python dependencies installed"
        );

        let site_packages = site_packages_dir(&venv)
            .ok_or_else(|| DependencyError::SitePackagesMissing { venv: venv.clone() })?;
        Ok(Some(PathMapping::at_root(mapping_source(
            &site_packages,
            project_dir,
        ))))
    }

    /// Create the virtual environment at `venv`.
    ///
    /// With [`CachePolicy::Fresh`] any previous environment is deleted first;
    /// with [`CachePolicy::Keep`] an existing environment is reused as is.
    pub async fn provision_virtualenv(
        &self,
        runtime: &Runtime,
        venv: &Path,
        project_dir: &Path,
        policy: CachePolicy,
    ) -> Result<()> {
        if !policy.is_keep() {
            remove_dir_if_exists(venv)?;
        } else if venv_pip(venv).exists() {
            tracing::debug!(venv = %venv.display(), "reusing cached virtualenv");
            return Ok(());
        }

        if let Some(parent) = venv.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DependencyError::Io {
                action: "failed to create",
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let interpreter = runtime
            .interpreter()
            .ok_or_else(|| DependencyError::UnsupportedRuntime(runtime.identifier()))?;
        let command = ToolCommand::new(interpreter, project_dir)
            .args(["-m", "venv"])
            .arg(venv.display().to_string());

        tracing::info!(venv = %venv.display(), runtime = %runtime, "creating virtualenv");
        self.executor
            .exec(&command)
            .await
            .map_err(|e| DependencyError::EnvironmentProvisioning {
                path: venv.to_path_buf(),
                source: e,
            })?;
        Ok(())
    }

    /// Install the requirements in `manifest` into `venv`, taking exact pins
    /// from the wheel index when available.
    pub async fn install_requirements(
        &self,
        runtime: &Runtime,
        venv: &Path,
        manifest: &Path,
        project_dir: &Path,
    ) -> Result<InstallReport> {
        let content = std::fs::read_to_string(manifest).map_err(|e| DependencyError::Io {
            action: "failed to read",
            path: manifest.to_path_buf(),
            source: e,
        })?;

        let runtime_id = runtime.identifier();
        let mut report = InstallReport::default();
        let mut wheel_locations = Vec::new();

        for requirement in parse_requirements(&content) {
            let cached = requirement.pin.as_ref().and_then(|pin| {
                self.wheels
                    .find(&runtime_id, &pin.name, &pin.version)
                    .map(|location| (pin, location))
            });
            match cached {
                Some((pin, location)) => {
                    tracing::info!(
                        package = %pin.name,
                        version = %pin.version,
                        "using cached wheel"
                    );
                    report.cached.push(pin.name.clone());
                    wheel_locations.push(location);
                }
                None => report.from_source.push(requirement.line),
            }
        }

        if wheel_locations.is_empty() && report.from_source.is_empty() {
            return Ok(report);
        }

        let mut command = ToolCommand::new(venv_pip(venv), project_dir)
            .arg("install")
            .args(wheel_locations);

        if !report.from_source.is_empty() {
            let requirements_file = if report.cached.is_empty() {
                manifest.to_path_buf()
            } else {
                let base = manifest.parent().unwrap_or(project_dir);
                let path = venv.join(REMAINING_REQUIREMENTS_FILE);
                let mut remaining = report
                    .from_source
                    .iter()
                    .map(|line| rebase_include(line, base))
                    .collect::<Vec<_>>()
                    .join("\n");
                remaining.push('\n');
                std::fs::write(&path, remaining).map_err(|e| DependencyError::Io {
                    action: "failed to write",
                    path: path.clone(),
                    source: e,
                })?;
                path
            };
            command = command
                .arg("-r")
                .arg(requirements_file.display().to_string());
        }

        self.executor
            .exec(&command)
            .await
            .map_err(DependencyError::installation)?;

        Ok(report)
    }
}
