use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::time::Instant;

/// Phase of a profiling session. Sessions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing has been spawned yet
    Idle,
    /// Target server is being spawned
    ServerStarting,
    /// Waiting out the warm-up delay and the optional readiness probe
    WarmingUp,
    /// Profiler is attached, load not started yet
    ProfilingAttached,
    /// Shots are being fired
    LoadActive,
    /// Server and profiler are being stopped
    Stopping,
    /// Capture is being turned into the report artifact
    ReportGenerating,
    /// Report written
    Done,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::ServerStarting => write!(f, "server_starting"),
            SessionState::WarmingUp => write!(f, "warming_up"),
            SessionState::ProfilingAttached => write!(f, "profiling_attached"),
            SessionState::LoadActive => write!(f, "load_active"),
            SessionState::Stopping => write!(f, "stopping"),
            SessionState::ReportGenerating => write!(f, "report_generating"),
            SessionState::Done => write!(f, "done"),
        }
    }
}

impl SessionState {
    /// The only state this one may move to.
    pub fn next(self) -> Option<SessionState> {
        match self {
            SessionState::Idle => Some(SessionState::ServerStarting),
            SessionState::ServerStarting => Some(SessionState::WarmingUp),
            SessionState::WarmingUp => Some(SessionState::ProfilingAttached),
            SessionState::ProfilingAttached => Some(SessionState::LoadActive),
            SessionState::LoadActive => Some(SessionState::Stopping),
            SessionState::Stopping => Some(SessionState::ReportGenerating),
            SessionState::ReportGenerating => Some(SessionState::Done),
            SessionState::Done => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done)
    }

    /// Whether the profiler may be running in this state
    pub fn is_profiling(&self) -> bool {
        matches!(
            self,
            SessionState::ProfilingAttached | SessionState::LoadActive | SessionState::Stopping
        )
    }
}

/// Attempted move that skips or revisits a phase.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Invalid session transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: SessionState,
    pub to: SessionState,
}

/// One recorded state change.
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from_state: SessionState,
    pub to_state: SessionState,
    /// Wall clock time, for logs and reports
    pub timestamp: DateTime<Utc>,
    /// Monotonic time, for ordering checks
    pub at: Instant,
    pub reason: Option<String>,
}

/// Forward-only session state machine with a full transition history.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    current_state: SessionState,
    history: Vec<StateTransition>,
    created_at: Instant,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: SessionState::Idle,
            history: Vec::new(),
            created_at: Instant::now(),
        }
    }

    pub fn current_state(&self) -> SessionState {
        self.current_state
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    pub fn is_valid_transition(&self, target_state: SessionState) -> bool {
        self.current_state.next() == Some(target_state)
    }

    /// Move to `target_state`, recording when and why.
    pub fn transition_to(
        &mut self,
        target_state: SessionState,
        reason: Option<String>,
    ) -> Result<(), InvalidTransition> {
        if !self.is_valid_transition(target_state) {
            return Err(InvalidTransition {
                from: self.current_state,
                to: target_state,
            });
        }

        let transition = StateTransition {
            from_state: self.current_state,
            to_state: target_state,
            timestamp: Utc::now(),
            at: Instant::now(),
            reason,
        };

        tracing::debug!(
            "Session transitioned from {} to {}{}",
            transition.from_state,
            transition.to_state,
            transition
                .reason
                .as_deref()
                .map(|r| format!(" ({})", r))
                .unwrap_or_default()
        );

        self.current_state = target_state;
        self.history.push(transition);
        Ok(())
    }

    /// The transition that entered `state`, if the session got that far.
    pub fn entered(&self, state: SessionState) -> Option<&StateTransition> {
        self.history.iter().find(|t| t.to_state == state)
    }

    /// Monotonic time spent between entering `from` and entering `to`.
    pub fn time_between(&self, from: SessionState, to: SessionState) -> Option<std::time::Duration> {
        let start = self.entered(from)?.at;
        let end = self.entered(to)?.at;
        end.checked_duration_since(start)
    }

    /// Time since the session was created.
    pub fn elapsed(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
