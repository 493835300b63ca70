use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use loadprof_common::CommandLine;
use loadprof_session::{HarnessConfig, Session};

/// Exit code after SIGINT/SIGTERM, as a shell would report it
const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Start a server, profile it under deterministic load, render a flamegraph
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server launch command, e.g. "./game_server -c config.json -w static"
    #[arg(value_name = "SERVER")]
    server: Option<String>,

    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Number of requests to fire (overrides config)
    #[arg(long)]
    shots: Option<usize>,

    /// PRNG seed for target selection (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Flamegraph output path (overrides config)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config = load_config(&args)?;

    initialize_logging(args.debug, &config.log_level)?;

    let server = match (&args.server, &config.server.command) {
        (Some(line), _) => CommandLine::parse(line).context("Invalid server command")?,
        (None, Some(command)) => command.clone(),
        (None, None) => {
            return Err(anyhow!(
                "No server command given; pass SERVER or set server.command in the config file"
            ))
        }
    };

    info!("Starting loadprof {}", env!("CARGO_PKG_VERSION"));
    info!("Server command: {}", server);

    // One control thread: every step of a session is awaited in sequence.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_session(config, server))
}

fn load_config(args: &Args) -> Result<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load_from_file(path)?,
        None => HarnessConfig::default(),
    };

    if let Some(shots) = args.shots {
        config.load.shots = shots;
    }
    if let Some(seed) = args.seed {
        config.load.seed = seed;
    }
    if let Some(ref output) = args.output {
        config.report.output = output.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run_session(config: HarnessConfig, server: CommandLine) -> Result<ExitCode> {
    let session = Session::from_config(&config, server).context("Invalid load configuration")?;

    info!(
        "Profiling with {} shots over {} target(s), seed {}",
        session.shots(),
        config.load.targets.len(),
        config.load.seed
    );

    tokio::select! {
        result = session.run() => match result {
            Ok(report) => {
                info!(
                    "Load: {} issued, {} hit, {} missed in {:?}",
                    report.load.issued, report.load.succeeded, report.load.failed, report.load.elapsed
                );
                println!("{} created", report.artifact.display());
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                let code = u8::try_from(e.exit_code()).unwrap_or(1);
                error!("Profiling failed in state {}, exiting with code {}", e.state, code);
                Ok(ExitCode::from(code))
            }
        },
        _ = shutdown_signal() => {
            // Dropping the session future terminates the server and profiler.
            warn!("Interrupted, terminating child processes");
            Ok(ExitCode::from(INTERRUPTED_EXIT_CODE))
        }
    }
}

fn initialize_logging(debug: bool, log_level: &str) -> Result<()> {
    let level = if debug { "debug" } else { log_level };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to install signal handlers: {}", e);
                return std::future::pending().await;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT signal");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("Received Ctrl+C signal");
    }
}
