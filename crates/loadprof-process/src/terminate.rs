//! Process termination primitives.

use loadprof_common::{ProcessError, ProcessResult};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::debug;

/// Terminate a process gracefully (SIGTERM).
///
/// A process that no longer exists is not an error.
pub fn terminate_gracefully(pid: u32) -> ProcessResult<()> {
    send_signal(pid, Signal::SIGTERM)
}

/// Force kill a process (SIGKILL).
pub fn force_kill(pid: u32) -> ProcessResult<()> {
    send_signal(pid, Signal::SIGKILL)
}

fn send_signal(pid: u32, signal: Signal) -> ProcessResult<()> {
    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => {
            debug!("PID {} already gone, {:?} not delivered", pid, signal);
            Ok(())
        }
        Err(e) => Err(ProcessError::stop_failed(pid.to_string(), e.to_string())),
    }
}
