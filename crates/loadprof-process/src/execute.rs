//! Pipeline stage execution.
//!
//! Short-lived external tools chained through OS pipes. Each stage is killed
//! when its `Child` is dropped, so abandoning a pipeline midway (error or
//! Ctrl-C) never leaves stages running.

use loadprof_common::{CommandLine, ProcessError, ProcessResult};
use std::process::Stdio;
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

/// Execute `command` with the given stdin/stdout wiring. Stderr is inherited
/// so tool diagnostics stay visible to the operator.
pub fn execute_command(command: &CommandLine, stdin: Stdio, stdout: Stdio) -> ProcessResult<Child> {
    debug!("Executing: {}", command);

    Command::new(command.program())
        .args(command.args())
        .stdin(stdin)
        .stdout(stdout)
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ProcessError::spawn_failed(command.program(), e.to_string()))
}

/// Turn a stage's piped stdout into the stdin of the next stage.
pub fn pipe_into_next(stdout: ChildStdout) -> ProcessResult<Stdio> {
    stdout
        .try_into()
        .map_err(|e: std::io::Error| ProcessError::spawn_failed("pipe", e.to_string()))
}
