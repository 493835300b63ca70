use crate::state::{InvalidTransition, SessionState};
use loadprof_common::ProcessError;
use loadprof_load::LoadError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Report pipeline error types
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Report stage '{stage}' could not start: {source}")]
    Spawn {
        stage: &'static str,
        #[source]
        source: ProcessError,
    },

    #[error("Report stage '{stage}' failed with {}", describe_code(.code))]
    StageFailed {
        stage: &'static str,
        code: Option<i32>,
    },

    #[error("Report I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Waiting for report stage '{stage}' failed: {reason}")]
    Wait { stage: &'static str, reason: String },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

/// What went wrong inside a session.
#[derive(Error, Debug)]
pub enum SessionFailure {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    State(#[from] InvalidTransition),

    #[error("Profiler stopped before the load phase ended (capture {capture:?}, load took {load:?})")]
    CaptureEndedEarly { capture: Duration, load: Duration },
}

/// A session that did not reach `Done`.
///
/// Carries the state the session was in when it failed; every child process
/// has been terminated by the time this is returned.
#[derive(Error, Debug)]
#[error("Session aborted in state {state}: {source}")]
pub struct SessionError {
    pub state: SessionState,
    #[source]
    pub source: SessionFailure,
}

impl SessionError {
    /// Process exit code for this failure.
    ///
    /// A report tool that exited non-zero has its code passed through; every
    /// other failure maps to 1.
    pub fn exit_code(&self) -> i32 {
        match &self.source {
            SessionFailure::Report(ReportError::StageFailed {
                code: Some(code), ..
            }) if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
