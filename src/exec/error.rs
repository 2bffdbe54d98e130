// ABOUTME: Error types for subprocess execution.
// ABOUTME: Distinguishes start failures, timeouts, and non-zero exits.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("`{command}` exited with status {code}")]
    NonZeroExit { command: String, code: i32 },

    #[error("failed waiting for `{command}`: {source}")]
    Wait {
        command: String,
        source: std::io::Error,
    },
}

impl ExecError {
    /// The shell line that failed.
    pub fn command(&self) -> &str {
        match self {
            ExecError::Spawn { command, .. }
            | ExecError::Timeout { command, .. }
            | ExecError::NonZeroExit { command, .. }
            | ExecError::Wait { command, .. } => command,
        }
    }

    /// Exit code, when the command ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }
}
