//! Readiness probing.
//!
//! Polls a lightweight endpoint until the server answers with a 2xx status,
//! giving up after `max_wait`.

use crate::http::HttpShotClient;
use crate::{LoadError, LoadResult};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info};

/// Bounded retry loop against an HTTP endpoint.
#[derive(Clone)]
pub struct ReadinessProbe {
    endpoint: String,
    interval: Duration,
    max_wait: Duration,
    client: HttpShotClient,
}

/// How long the server took to become ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyReport {
    pub attempts: u32,
    pub waited: Duration,
}

impl ReadinessProbe {
    pub fn new(endpoint: impl Into<String>, interval: Duration, attempt_timeout: Duration, max_wait: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            interval,
            max_wait,
            client: HttpShotClient::new(attempt_timeout),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Poll until ready or until `max_wait` has elapsed.
    pub async fn wait_until_ready(&self) -> LoadResult<ReadyReport> {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let budget = self
                .client
                .request_timeout()
                .min(self.max_wait.saturating_sub(started.elapsed()));
            let reason = match self.client.get_within(&self.endpoint, budget).await {
                Ok(status) if (200..300).contains(&status) => {
                    let report = ReadyReport {
                        attempts,
                        waited: started.elapsed(),
                    };
                    info!(
                        "Server ready at {} after {} attempt(s), {:?}",
                        self.endpoint, report.attempts, report.waited
                    );
                    return Ok(report);
                }
                Ok(status) => format!("Unexpected status code: {}", status),
                Err(reason) => reason,
            };

            let waited = started.elapsed();
            if waited + self.interval > self.max_wait {
                return Err(LoadError::NotReady {
                    endpoint: self.endpoint.clone(),
                    waited,
                    reason,
                });
            }

            debug!("Readiness attempt {} at {} failed: {}", attempts, self.endpoint, reason);
            sleep(self.interval).await;
        }
    }
}
