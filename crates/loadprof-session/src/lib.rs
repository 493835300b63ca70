//! # loadprof session
//!
//! Runs one profiling session end to end.
//!
//! This crate provides:
//! - `HarnessConfig` - YAML configuration with defaults and validation
//! - `SessionStateMachine` - forward-only session phases with history
//! - `ProfilerLauncher` - profiler command rendering and capture modes
//! - `ReportPipeline` - export | collapse | render into the artifact
//! - `Session` - the orchestrator tying them together

pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod profiler;
pub mod report;
pub mod state;

// Re-export main types
pub use config::HarnessConfig;
pub use errors::{ReportError, ReportResult, SessionError, SessionFailure, SessionResult};
pub use orchestrator::{Session, SessionReport};
pub use profiler::{CaptureMode, ProfilerLauncher};
pub use report::ReportPipeline;
pub use state::{InvalidTransition, SessionState, SessionStateMachine, StateTransition};
