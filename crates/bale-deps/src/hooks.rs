use std::path::{Path, PathBuf};

use crate::executor::{ToolCommand, ToolExecutor};
use crate::tool::ToolError;

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("pre-bundle script failed: {script}")]
    HookFailed { script: String, source: ToolError },
}

/// Run pre-bundle scripts in order inside `project_dir`.
///
/// Stops at the first script that fails. Script output is logged at debug
/// level.
pub async fn run_prebundle<E: ToolExecutor>(
    executor: &E,
    scripts: &[String],
    project_dir: &Path,
) -> Result<(), HookError> {
    for script in scripts {
        tracing::info!(%script, "running pre-bundle script");
        let command = ToolCommand::new(script_path(script, project_dir), project_dir);
        match executor.exec(&command).await {
            Ok(output) => tracing::debug!(%script, %output, "pre-bundle script finished"),
            Err(e) => {
                if let Some(output) = e.output() {
                    tracing::debug!(%script, %output, "pre-bundle script output");
                }
                return Err(HookError::HookFailed {
                    script: script.clone(),
                    source: e,
                });
            }
        }
    }
    Ok(())
}

/// Scripts given as paths are resolved against the project directory; bare
/// names are left for `PATH` lookup.
fn script_path(script: &str, project_dir: &Path) -> PathBuf {
    let path = Path::new(script);
    if path.is_absolute() || !script.contains('/') {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}
