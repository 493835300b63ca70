//! ProcessHandle - one spawned child process and its lifecycle.
//!
//! A handle owns its child exclusively. The exit status is read from the OS
//! at most once and cached; every later query answers from the cache.
//!
//! Dropping a handle whose process is still running sends it a graceful
//! termination signal, so a session that bails out early (error, Ctrl-C)
//! does not leave orphans behind.

use loadprof_common::{CommandLine, ProcessError, ProcessResult};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

const FORCE_KILL_TIMEOUT: Duration = Duration::from_secs(3);

/// Where a child's stdout goes. Stderr is always discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Inherit,
    Null,
}

impl OutputMode {
    fn stdio(self) -> Stdio {
        match self {
            OutputMode::Inherit => Stdio::inherit(),
            OutputMode::Null => Stdio::null(),
        }
    }
}

/// A spawned OS process.
#[derive(Debug)]
pub struct ProcessHandle {
    name: String,
    pid: u32,
    child: Child,
    exit_status: Option<ExitStatus>,
}

impl ProcessHandle {
    /// Spawn `command` directly (no shell). Stdin is closed, stderr discarded.
    ///
    /// Spawn failures are returned as-is; callers must not retry them.
    pub fn start(name: impl Into<String>, command: &CommandLine, output: OutputMode) -> ProcessResult<Self> {
        let name = name.into();
        info!("Spawning {}: {}", name, command);

        let mut cmd = Command::new(command.program());
        cmd.args(command.args())
            .stdin(Stdio::null())
            .stdout(output.stdio())
            .stderr(Stdio::null());

        let child = cmd
            .spawn()
            .map_err(|e| ProcessError::spawn_failed(&name, format!("{}: {}", command.program(), e)))?;

        let pid = child
            .id()
            .ok_or_else(|| ProcessError::spawn_failed(&name, "process has no PID after spawn"))?;

        info!("{} spawned successfully (PID: {})", name, pid);

        Ok(Self {
            name,
            pid,
            child,
            exit_status: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Exit status if it has already been observed. Never touches the OS.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Non-blocking poll for exit.
    pub fn try_status(&mut self) -> ProcessResult<Option<ExitStatus>> {
        if let Some(status) = self.exit_status {
            return Ok(Some(status));
        }

        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.record_exit(status);
                Ok(Some(status))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(ProcessError::wait_failed(&self.name, e.to_string())),
        }
    }

    pub fn is_running(&mut self) -> ProcessResult<bool> {
        Ok(self.try_status()?.is_none())
    }

    /// Block until the process exits.
    pub async fn wait(&mut self) -> ProcessResult<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| ProcessError::wait_failed(&self.name, e.to_string()))?;
        self.record_exit(status);
        Ok(status)
    }

    /// Send a graceful termination signal.
    ///
    /// With `wait_first`, first block until the process exits on its own; the
    /// signal is then only sent if it is somehow still running. Stopping a
    /// process that already exited is a no-op.
    pub async fn stop(&mut self, wait_first: bool) -> ProcessResult<()> {
        if wait_first && self.exit_status.is_none() {
            debug!("Waiting for {} (PID: {}) to exit on its own", self.name, self.pid);
            self.wait().await?;
        }

        if self.try_status()?.is_some() {
            debug!("{} (PID: {}) already exited, nothing to stop", self.name, self.pid);
            return Ok(());
        }

        info!("Sending termination signal to {} (PID: {})", self.name, self.pid);
        self.signal_terminate()
    }

    /// Wait up to `grace` for the process to exit, then force kill it.
    pub async fn reap(&mut self, grace: Duration) -> ProcessResult<ExitStatus> {
        let waited = timeout(grace, self.wait()).await;
        if let Ok(result) = waited {
            return result;
        }

        warn!(
            "{} (PID: {}) did not exit within {:?}, attempting force kill",
            self.name, self.pid, grace
        );
        self.signal_kill()?;

        let waited = timeout(FORCE_KILL_TIMEOUT, self.wait()).await;
        match waited {
            Ok(result) => result,
            Err(_) => Err(ProcessError::timeout(
                &self.name,
                format!(
                    "reap (did not exit after grace {:?} + force-kill timeout {:?})",
                    grace, FORCE_KILL_TIMEOUT
                ),
            )),
        }
    }

    fn signal_terminate(&mut self) -> ProcessResult<()> {
        #[cfg(unix)]
        {
            crate::terminate::terminate_gracefully(self.pid)
                .map_err(|e| ProcessError::stop_failed(&self.name, e.to_string()))
        }

        #[cfg(not(unix))]
        {
            self.child
                .start_kill()
                .map_err(|e| ProcessError::stop_failed(&self.name, e.to_string()))
        }
    }

    fn signal_kill(&mut self) -> ProcessResult<()> {
        #[cfg(unix)]
        {
            crate::terminate::force_kill(self.pid)
                .map_err(|e| ProcessError::stop_failed(&self.name, e.to_string()))
        }

        #[cfg(not(unix))]
        {
            self.child
                .start_kill()
                .map_err(|e| ProcessError::stop_failed(&self.name, e.to_string()))
        }
    }

    fn record_exit(&mut self, status: ExitStatus) {
        if status.success() {
            info!("{} (PID: {}) exited successfully", self.name, self.pid);
        } else {
            info!("{} (PID: {}) exited with status: {}", self.name, self.pid, status);
        }
        self.exit_status = Some(status);
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        match self.try_status() {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(
                    "{} (PID: {}) still running when its handle was dropped, terminating",
                    self.name, self.pid
                );
                if let Err(e) = self.signal_terminate() {
                    warn!("Failed to terminate {} on drop: {}", self.name, e);
                }
            }
            Err(e) => warn!("Could not poll {} on drop: {}", self.name, e),
        }
    }
}
