//! Sampling profiler attachment.
//!
//! The profiler is an external program attached to the server by PID. Its
//! capture window either ends when it is signalled at teardown, or after a
//! fixed duration the profiler enforces itself.

use crate::config::{CaptureModeKind, ProfilerConfig};
use loadprof_common::{CommandLine, ProcessResult};
use loadprof_process::{OutputMode, ProcessHandle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// How the capture window ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Runs until signalled at teardown
    ExplicitStop,
    /// Exits on its own after the given duration
    FixedDuration(Duration),
}

/// Everything needed to attach a profiler to a PID.
#[derive(Debug, Clone)]
pub struct ProfilerLauncher {
    command: CommandLine,
    frequency: u32,
    capture_path: PathBuf,
    mode: CaptureMode,
    duration_args: Vec<String>,
}

impl ProfilerLauncher {
    pub fn new(command: CommandLine, frequency: u32, capture_path: impl Into<PathBuf>, mode: CaptureMode) -> Self {
        Self {
            command,
            frequency,
            capture_path: capture_path.into(),
            mode,
            duration_args: vec!["--".to_string(), "sleep".to_string(), "{seconds}".to_string()],
        }
    }

    /// Build from a validated profiler section.
    pub fn from_config(config: &ProfilerConfig) -> Self {
        let mode = match (config.mode, config.capture_duration) {
            (CaptureModeKind::FixedDuration, Some(duration)) => CaptureMode::FixedDuration(duration),
            (CaptureModeKind::FixedDuration, None) => {
                warn!("fixed_duration capture without capture_duration, falling back to explicit stop");
                CaptureMode::ExplicitStop
            }
            (CaptureModeKind::ExplicitStop, _) => CaptureMode::ExplicitStop,
        };

        Self {
            command: config.command.clone(),
            frequency: config.frequency,
            capture_path: config.capture_path.clone(),
            mode,
            duration_args: config.duration_args.clone(),
        }
    }

    pub fn with_duration_args(mut self, duration_args: Vec<String>) -> Self {
        self.duration_args = duration_args;
        self
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn capture_path(&self) -> &Path {
        &self.capture_path
    }

    /// The concrete command line for attaching to `pid`.
    pub fn command_for(&self, pid: u32) -> CommandLine {
        let pid = pid.to_string();
        let frequency = self.frequency.to_string();
        let output = self.capture_path.to_string_lossy();

        let rendered = self.command.render(&[
            ("pid", pid.as_str()),
            ("frequency", frequency.as_str()),
            ("output", output.as_ref()),
        ]);

        match self.mode {
            CaptureMode::ExplicitStop => rendered,
            CaptureMode::FixedDuration(duration) => {
                let seconds = format_seconds(duration);
                rendered.with_args(
                    self.duration_args
                        .iter()
                        .map(|arg| arg.replace("{seconds}", &seconds)),
                )
            }
        }
    }

    /// Spawn the profiler against `pid`.
    pub fn attach(&self, pid: u32) -> ProcessResult<ProcessHandle> {
        #[cfg(unix)]
        if !loadprof_process::process_exists(pid)? {
            return Err(loadprof_common::ProcessError::spawn_failed(
                "profiler",
                format!("target PID {} does not exist", pid),
            ));
        }

        let command = self.command_for(pid);
        info!(
            "Attaching profiler to PID {} ({:?}), capture: {}",
            pid,
            self.mode,
            self.capture_path.display()
        );
        ProcessHandle::start("profiler", &command, OutputMode::Null)
    }

    /// End the capture window.
    ///
    /// In explicit-stop mode the profiler is signalled. In fixed-duration
    /// mode this waits for it to finish on its own, for at most the capture
    /// duration plus `grace`, and signals it after that.
    pub async fn detach(&self, profiler: &mut ProcessHandle, grace: Duration) -> ProcessResult<()> {
        match self.mode {
            CaptureMode::ExplicitStop => {
                if profiler.try_status()?.is_some() {
                    warn!(
                        "Profiler (PID: {}) exited before it was stopped, capture may be incomplete",
                        profiler.pid()
                    );
                }
                profiler.stop(false).await
            }
            CaptureMode::FixedDuration(duration) => {
                info!("Waiting for fixed {:?} capture to finish", duration);
                let limit = duration.saturating_add(grace);
                if timeout(limit, profiler.wait()).await.is_err() {
                    warn!(
                        "Profiler (PID: {}) still running {:?} past its capture duration, stopping it",
                        profiler.pid(),
                        grace
                    );
                }
                profiler.stop(false).await
            }
        }
    }
}

fn format_seconds(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        duration.as_secs().to_string()
    } else {
        format!("{:.3}", duration.as_secs_f64())
    }
}
