use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::tool::ToolError;

/// A fully described external command: program, arguments, working
/// directory, and extra environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, OsString)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>, cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Returns `true` if any argument equals `needle`.
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }

    /// Returns `true` if the program's file name equals `name`.
    pub fn is_program(&self, name: &str) -> bool {
        self.program
            .file_name()
            .is_some_and(|f| f.to_string_lossy() == name)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Abstraction over external process execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait ToolExecutor: Send + Sync {
    /// Run a command to completion and return its combined stdout/stderr.
    async fn exec(&self, command: &ToolCommand) -> Result<String, ToolError>;
}

/// Spawns real child processes and waits for them to exit.
pub struct RealExecutor;

impl ToolExecutor for RealExecutor {
    async fn exec(&self, command: &ToolCommand) -> Result<String, ToolError> {
        use std::process::Stdio;

        tracing::debug!(command = %command, cwd = %command.cwd.display(), "running");

        let output = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .envs(command.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ToolError::NotFound {
                program: command.program.display().to_string(),
                source: e,
            })?;

        if output.status.success() {
            let mut combined = output.stdout;
            combined.extend_from_slice(&output.stderr);
            String::from_utf8(combined).map_err(|e| ToolError::InvalidUtf8 {
                program: command.program.display().to_string(),
                source: e,
            })
        } else {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            Err(ToolError::CommandFailed {
                command: command.to_string(),
                status: output.status.to_string(),
                output: combined,
            })
        }
    }
}
