//! Error types for process control.
//!
//! Spawn failures are fatal for a profiling session and are never retried,
//! so callers mostly just propagate these with `?`.

use thiserror::Error;

/// Process-specific error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Process spawn failed: {id} - {reason}")]
    SpawnFailed { id: String, reason: String },

    #[error("Process stop failed: {id} - {reason}")]
    StopFailed { id: String, reason: String },

    #[error("Process wait failed: {id} - {reason}")]
    WaitFailed { id: String, reason: String },

    #[error("Process timeout: {id} - {operation}")]
    Timeout { id: String, operation: String },

    #[error("Invalid command line '{command}': {reason}")]
    InvalidCommand { command: String, reason: String },
}

impl ProcessError {
    pub fn spawn_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn stop_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StopFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn wait_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WaitFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout(id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Timeout {
            id: id.into(),
            operation: operation.into(),
        }
    }

    pub fn invalid_command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCommand {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised before any process existed.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::SpawnFailed { .. } | Self::InvalidCommand { .. })
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;
