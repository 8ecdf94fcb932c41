use std::path::PathBuf;

use crate::tool::ToolError;

pub type Result<T> = std::result::Result<T, DependencyError>;

#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error("runtime '{0}' is not supported")]
    UnsupportedRuntime(String),

    #[error("failed to provision isolated environment at {path}")]
    EnvironmentProvisioning { path: PathBuf, source: ToolError },

    /// The install command exited non-zero. `output` is only logged at
    /// debug level and is not part of the message.
    #[error("unable to install dependencies ({command})")]
    DependencyInstallation { command: String, output: String },

    #[error("no site-packages directory found in {venv}")]
    SitePackagesMissing { venv: PathBuf },

    #[error("invalid package manifest at {path}")]
    InvalidManifest {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cannot add {path} to PATH")]
    SearchPath {
        path: PathBuf,
        source: std::env::JoinPathsError,
    },

    #[error("{action} {path}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl DependencyError {
    /// Wrap a failed install step, logging the captured output at debug level.
    pub(crate) fn installation(err: ToolError) -> Self {
        match err {
            ToolError::CommandFailed {
                command, output, ..
            } => {
                tracing::debug!(%command, "install command failed");
                tracing::debug!(%output, "install command output");
                Self::DependencyInstallation { command, output }
            }
            other => {
                tracing::debug!(error = %other, "install command could not run");
                Self::DependencyInstallation {
                    command: other.to_string(),
                    output: String::new(),
                }
            }
        }
    }
}
