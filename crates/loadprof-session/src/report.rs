//! Report generation.
//!
//! Three external tools chained through OS pipes, equivalent to
//!
//! ```text
//! export {capture} | collapse | render > {output}
//! ```
//!
//! No stage goes through a shell. Every stage's exit status is checked, not
//! just the last one. The stages are owned by the `generate` future and die
//! with it.

use crate::config::ReportConfig;
use crate::errors::{ReportError, ReportResult};
use loadprof_common::CommandLine;
use loadprof_process::execute::{execute_command, pipe_into_next};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Child;
use tracing::{debug, info, warn};

/// The export, collapse and render stages plus the artifact path.
#[derive(Debug, Clone)]
pub struct ReportPipeline {
    export: CommandLine,
    collapse: CommandLine,
    render: CommandLine,
    output: PathBuf,
}

impl ReportPipeline {
    pub fn new(export: CommandLine, collapse: CommandLine, render: CommandLine, output: impl Into<PathBuf>) -> Self {
        Self {
            export,
            collapse,
            render,
            output: output.into(),
        }
    }

    pub fn from_config(config: &ReportConfig) -> Self {
        Self::new(
            config.export.clone(),
            config.collapse.clone(),
            config.render.clone(),
            config.output.clone(),
        )
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Turn `capture` into the report artifact.
    ///
    /// On failure the capture file is left untouched and a partially written
    /// artifact may remain. Dropping the returned future kills every stage.
    pub async fn generate(&self, capture: &Path) -> ReportResult<PathBuf> {
        let capture_str = capture.to_string_lossy();
        let output_str = self.output.to_string_lossy();
        let values = [("capture", capture_str.as_ref()), ("output", output_str.as_ref())];

        let export = self.export.render(&values);
        let collapse = self.collapse.render(&values);
        let render = self.render.render(&values);

        info!("Generating report: {} | {} | {} > {}", export, collapse, render, self.output.display());

        let artifact = File::create(&self.output).map_err(|source| ReportError::Io {
            path: self.output.clone(),
            source,
        })?;

        let mut stages: Vec<(&'static str, Child)> = Vec::with_capacity(3);

        let exporter = spawn_stage("export", &export, Stdio::null(), Stdio::piped(), &mut stages).await?;
        let collapser = spawn_stage("collapse", &collapse, exporter, Stdio::piped(), &mut stages).await?;
        spawn_stage("render", &render, collapser, Stdio::from(artifact), &mut stages).await?;

        let mut failures: Vec<(&'static str, ExitStatus)> = Vec::new();
        for (stage, child) in stages.iter_mut() {
            let stage = *stage;
            let status = child.wait().await.map_err(|e| ReportError::Wait {
                stage,
                reason: e.to_string(),
            })?;
            debug!("Report stage '{}' finished: {}", stage, status);
            if !status.success() {
                failures.push((stage, status));
            }
        }

        // A stage killed by a signal is usually an upstream victim of SIGPIPE
        // after a downstream stage died; blame a stage with an exit code first.
        let blamed = failures
            .iter()
            .find(|(_, status)| status.code().is_some())
            .or_else(|| failures.first());

        if let Some(&(stage, status)) = blamed {
            warn!(
                "Report stage '{}' failed ({}), capture kept at {}",
                stage,
                status,
                capture.display()
            );
            return Err(ReportError::StageFailed {
                stage,
                code: status.code(),
            });
        }

        info!("Report written to {}", self.output.display());
        Ok(self.output.clone())
    }
}

/// Spawn one stage and return its stdout for the next stage.
///
/// If the stage cannot start, the stages already running are killed and
/// reaped before the error is returned.
async fn spawn_stage(
    stage: &'static str,
    command: &CommandLine,
    stdin: Stdio,
    stdout: Stdio,
    stages: &mut Vec<(&'static str, Child)>,
) -> ReportResult<Stdio> {
    let spawned = execute_command(command, stdin, stdout).and_then(|mut child| {
        let next_stdin = match child.stdout.take() {
            Some(out) => pipe_into_next(out)?,
            None => Stdio::null(),
        };
        Ok((child, next_stdin))
    });

    match spawned {
        Ok((child, next_stdin)) => {
            stages.push((stage, child));
            Ok(next_stdin)
        }
        Err(source) => {
            for (earlier, mut child) in stages.drain(..) {
                debug!("Killing report stage '{}' after spawn failure", earlier);
                let _ = child.kill().await;
            }
            Err(ReportError::Spawn { stage, source })
        }
    }
}
