//! Session orchestration.
//!
//! One session drives the whole run in strict order:
//!
//! ```text
//! spawn server -> warm-up [-> readiness] -> attach profiler -> all shots
//!   -> stop server -> settle -> stop profiler -> reap -> report
//! ```
//!
//! Every step is awaited on the calling task; there is no concurrent work.
//! Children are owned by the session, so any way out of `run` (success,
//! error, or the future being dropped) terminates them.

use crate::config::HarnessConfig;
use crate::errors::{SessionError, SessionFailure, SessionResult};
use crate::profiler::{CaptureMode, ProfilerLauncher};
use crate::report::ReportPipeline;
use crate::state::{SessionState, SessionStateMachine, StateTransition};
use loadprof_common::CommandLine;
use loadprof_load::{
    run_shots, HttpShotClient, LoadReport, LoadResult, ReadinessProbe, ScheduleConfig, Scheduler, ShotClient,
    TargetCatalog,
};
use loadprof_process::{OutputMode, ProcessHandle};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Outcome of a session that reached `Done`.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub artifact: PathBuf,
    pub capture: PathBuf,
    pub server_pid: u32,
    pub load: LoadReport,
    pub transitions: Vec<StateTransition>,
}

/// Processes owned by a running session.
#[derive(Default)]
struct Children {
    server: Option<ProcessHandle>,
    profiler: Option<ProcessHandle>,
}

impl Children {
    /// Best-effort shutdown of whatever is still running.
    async fn terminate_all(&mut self, grace: Duration) {
        for handle in [self.profiler.as_mut(), self.server.as_mut()].into_iter().flatten() {
            if let Err(e) = handle.stop(false).await {
                warn!("Failed to stop {}: {}", handle.name(), e);
            }
            if let Err(e) = handle.reap(grace).await {
                warn!("Failed to reap {}: {}", handle.name(), e);
            }
        }
    }
}

/// A configured, not yet started profiling session.
pub struct Session<C: ShotClient = HttpShotClient> {
    plan: Plan,
    schedule: Scheduler,
    client: C,
}

impl Session<HttpShotClient> {
    /// Session firing real HTTP requests with the configured timeout.
    pub fn from_config(config: &HarnessConfig, server_command: CommandLine) -> LoadResult<Self> {
        let client = HttpShotClient::new(config.load.request_timeout);
        Self::with_client(config, server_command, client)
    }
}

impl<C: ShotClient> Session<C> {
    /// Session firing shots through `client`.
    pub fn with_client(config: &HarnessConfig, server_command: CommandLine, client: C) -> LoadResult<Self> {
        let catalog = TargetCatalog::new(config.load.targets.iter().map(String::as_str))?;
        let schedule = Scheduler::seeded(
            catalog,
            config.load.seed,
            ScheduleConfig {
                shots: config.load.shots,
                random_limit: config.load.random_limit,
                cooldown: config.load.cooldown,
            },
        )?;

        let readiness = config.server.readiness.as_ref().map(|r| {
            ReadinessProbe::new(r.endpoint.clone(), r.interval, r.attempt_timeout, r.max_wait)
        });

        let plan = Plan {
            server_command,
            warm_up: config.server.warm_up,
            settle: config.server.settle,
            graceful_timeout: config.server.graceful_timeout,
            readiness,
            profiler: ProfilerLauncher::from_config(&config.profiler),
            report: ReportPipeline::from_config(&config.report),
        };

        Ok(Self { plan, schedule, client })
    }

    /// Number of shots this session will fire.
    pub fn shots(&self) -> usize {
        self.schedule.remaining()
    }

    /// Run the session to completion.
    pub async fn run(self) -> SessionResult<SessionReport> {
        let Session { plan, schedule, client } = self;
        let mut state = SessionStateMachine::new();
        let mut children = Children::default();

        match plan.drive(&mut state, &mut children, schedule, &client).await {
            Ok(report) => Ok(report),
            Err(source) => {
                let state = state.current_state();
                error!("Session aborted in state {}: {}", state, source);
                children.terminate_all(plan.graceful_timeout).await;
                Err(SessionError { state, source })
            }
        }
    }
}

/// Fixed settings of a session.
struct Plan {
    server_command: CommandLine,
    warm_up: Duration,
    settle: Duration,
    graceful_timeout: Duration,
    readiness: Option<ReadinessProbe>,
    profiler: ProfilerLauncher,
    report: ReportPipeline,
}

impl Plan {
    async fn drive<C: ShotClient>(
        &self,
        state: &mut SessionStateMachine,
        children: &mut Children,
        schedule: Scheduler,
        client: &C,
    ) -> Result<SessionReport, SessionFailure> {
        state.transition_to(
            SessionState::ServerStarting,
            Some(format!("spawning {}", self.server_command)),
        )?;
        let server = ProcessHandle::start("server", &self.server_command, OutputMode::Null)?;
        let server_pid = server.pid();
        children.server = Some(server);

        state.transition_to(SessionState::WarmingUp, Some(format!("waiting {:?}", self.warm_up)))?;
        sleep(self.warm_up).await;
        if let Some(ref probe) = self.readiness {
            info!("Probing {} for readiness", probe.endpoint());
            probe.wait_until_ready().await?;
        }

        state.transition_to(
            SessionState::ProfilingAttached,
            Some(format!("profiling PID {}", server_pid)),
        )?;
        children.profiler = Some(self.profiler.attach(server_pid)?);

        let shots = schedule.remaining();
        state.transition_to(SessionState::LoadActive, Some(format!("firing {} shots", shots)))?;
        let load = run_shots(schedule, client).await;
        self.check_capture_window(children, &load)?;

        state.transition_to(
            SessionState::Stopping,
            Some(format!("{} of {} shots hit", load.succeeded, load.issued)),
        )?;
        self.teardown(children).await?;

        state.transition_to(SessionState::ReportGenerating, None)?;
        let artifact = self.report.generate(self.profiler.capture_path()).await?;

        state.transition_to(SessionState::Done, Some(format!("{} created", artifact.display())))?;
        info!("Session finished in {:?}", state.elapsed());

        Ok(SessionReport {
            artifact,
            capture: self.profiler.capture_path().to_path_buf(),
            server_pid,
            load,
            transitions: state.history().to_vec(),
        })
    }

    /// A self-expiring capture must still be running once every shot landed.
    fn check_capture_window(&self, children: &mut Children, load: &LoadReport) -> Result<(), SessionFailure> {
        let CaptureMode::FixedDuration(duration) = self.profiler.mode() else {
            return Ok(());
        };

        if let Some(profiler) = children.profiler.as_mut() {
            if let Some(status) = profiler.try_status()? {
                warn!(
                    "Profiler (PID: {}) exited ({}) before the load phase finished",
                    profiler.pid(),
                    status
                );
                return Err(SessionFailure::CaptureEndedEarly {
                    capture: duration,
                    load: load.elapsed,
                });
            }
        }

        Ok(())
    }

    /// Stop the server, let the profiler see the shutdown, then stop it.
    async fn teardown(&self, children: &mut Children) -> Result<(), SessionFailure> {
        if let Some(server) = children.server.as_mut() {
            if server.try_status()?.is_some() {
                warn!("Server (PID: {}) exited before teardown", server.pid());
            }
            server.stop(false).await?;
        }

        sleep(self.settle).await;

        if let Some(profiler) = children.profiler.as_mut() {
            self.profiler.detach(profiler, self.graceful_timeout).await?;
            if let Err(e) = profiler.reap(self.graceful_timeout).await {
                warn!("Profiler did not shut down cleanly: {}", e);
            }
        }

        if let Some(server) = children.server.as_mut() {
            if let Err(e) = server.reap(self.graceful_timeout).await {
                warn!("Server did not shut down cleanly: {}", e);
            }
        }

        Ok(())
    }
}
