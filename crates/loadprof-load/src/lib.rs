//! # loadprof load
//!
//! Synthetic load for profiling runs.
//!
//! This crate provides:
//! - `TargetCatalog` - the fixed list of request targets
//! - `Scheduler` - a seeded, reproducible sequence of shots
//! - `run_shots` - the strictly sequential load generator
//! - `HttpShotClient` - in-process HTTP GET with a per-request timeout
//! - `ReadinessProbe` - bounded wait for a server to start answering

pub mod catalog;
pub mod generator;
pub mod http;
pub mod readiness;
pub mod scheduler;

use std::time::Duration;
use thiserror::Error;

/// Load setup error types.
///
/// Individual request failures are not errors; they are reported as
/// `ShotOutcome::Miss` and only counted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Target catalog is empty")]
    EmptyCatalog,

    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Random limit {limit} must be larger than the catalog size {catalog_size}")]
    InvalidLimit { limit: u64, catalog_size: usize },

    #[error("Server not ready at {endpoint} after {waited:?}: {reason}")]
    NotReady {
        endpoint: String,
        waited: Duration,
        reason: String,
    },
}

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

// Re-export main types
pub use catalog::TargetCatalog;
pub use generator::{run_shots, LoadReport, ShotClient, ShotOutcome};
pub use http::HttpShotClient;
pub use readiness::{ReadinessProbe, ReadyReport};
pub use scheduler::{ScheduleConfig, Scheduler, Shot, DEFAULT_SEED};
