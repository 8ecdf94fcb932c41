/// Failure of an external tool invocation (pip, npm, nodeenv, hook scripts).
///
/// `output` holds the combined stdout/stderr of a failed command. It is kept
/// for diagnostics but deliberately left out of the `Display` message.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{program} could not be started; is it installed and on PATH?")]
    NotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("command exited with {status}: {command}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("{program} output was not valid UTF-8")]
    InvalidUtf8 {
        program: String,
        source: std::string::FromUtf8Error,
    },
}

impl ToolError {
    /// Captured output of the failed command, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}
