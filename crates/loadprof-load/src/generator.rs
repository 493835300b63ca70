//! Sequential load generation.
//!
//! Shots never overlap: each request is awaited to completion (or timeout)
//! and followed by its cooldown before the next one starts. The load phase
//! therefore lasts at least `shots × cooldown`.

use crate::scheduler::Shot;
use async_trait::async_trait;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info};

/// Result of a single request. Misses are expected under load and are only
/// counted, never escalated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShotOutcome {
    /// The server answered with a 2xx status
    Hit { status: u16 },
    /// Connection failure, timeout or non-2xx status
    Miss { reason: String },
}

impl ShotOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, ShotOutcome::Hit { .. })
    }
}

/// Issues one request and reports how it went.
#[async_trait]
pub trait ShotClient: Send + Sync {
    async fn fire(&self, target: &str) -> ShotOutcome;
}

/// Aggregate outcome of a load phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub issued: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Fire every shot of `schedule` in order, sleeping each shot's cooldown
/// after its request completes.
///
/// Returns exactly one report once all shots are done, however many of them
/// missed.
pub async fn run_shots<I, C>(schedule: I, client: &C) -> LoadReport
where
    I: IntoIterator<Item = Shot>,
    C: ShotClient + ?Sized,
{
    let started = Instant::now();
    let mut report = LoadReport::default();

    for shot in schedule {
        report.issued += 1;

        match client.fire(&shot.target).await {
            ShotOutcome::Hit { status } => {
                report.succeeded += 1;
                debug!("Shot {} -> {} ({})", report.issued, shot.target, status);
            }
            ShotOutcome::Miss { reason } => {
                report.failed += 1;
                debug!("Shot {} -> {} missed: {}", report.issued, shot.target, reason);
            }
        }

        sleep(shot.cooldown).await;
    }

    report.elapsed = started.elapsed();
    info!(
        "Shooting complete: {} shots ({} hit, {} missed) in {:?}",
        report.issued, report.succeeded, report.failed, report.elapsed
    );
    report
}
