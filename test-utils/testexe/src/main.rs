use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Test executable for loadprof E2E testing
#[derive(Parser, Debug)]
#[command(name = "testexe")]
#[command(about = "Stand-in server and profiler for loadprof testing", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Serve the map endpoints until SIGTERM
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: u16,

        /// Seconds to wait before binding the port
        #[arg(long, default_value = "0")]
        startup_delay: u64,

        /// Written once the listener is bound
        #[arg(long)]
        ready_file: Option<PathBuf>,

        /// Number of requests served, written on shutdown
        #[arg(long)]
        hits_file: Option<PathBuf>,
    },

    /// Pretend to sample a process until SIGTERM
    Record {
        /// PID of the process being profiled
        #[arg(long)]
        pid: u32,

        /// Capture file to write
        #[arg(long)]
        output: PathBuf,

        /// Sampling period in milliseconds
        #[arg(long, default_value = "50")]
        period_ms: u64,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so the harness output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("Starting testexe with args: {:?}", args);

    let code = match args.command {
        Mode::Serve {
            port,
            startup_delay,
            ready_file,
            hits_file,
        } => serve(port, startup_delay, ready_file, hits_file).await,
        Mode::Record { pid, output, period_ms } => record(pid, &output, Duration::from_millis(period_ms)).await,
    };

    std::process::exit(code);
}

async fn serve(port: u16, startup_delay: u64, ready_file: Option<PathBuf>, hits_file: Option<PathBuf>) -> i32 {
    use tokio::net::TcpListener;

    if startup_delay > 0 {
        info!("Delaying startup by {}s", startup_delay);
        sleep(Duration::from_secs(startup_delay)).await;
    }

    let addr = format!("127.0.0.1:{}", port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => {
            info!("Map server listening on http://{}", addr);
            // Chatty on stdout like a real server
            println!("serving maps on {}", addr);
            l
        }
        Err(e) => {
            error!("Failed to bind map server to {}: {}", addr, e);
            return 1;
        }
    };

    if let Some(path) = &ready_file {
        if let Err(e) = atomic_write_text(path, "ready\n") {
            warn!("Failed to write ready file {}: {}", path.display(), e);
        }
    }

    let hits = Arc::new(AtomicUsize::new(0));

    tokio::select! {
        _ = accept_loop(listener, hits.clone()) => {}
        _ = wait_for_termination() => {
            info!("Map server shutting down after {} requests", hits.load(Ordering::Relaxed));
        }
    }

    if let Some(path) = &hits_file {
        if let Err(e) = atomic_write_text(path, &hits.load(Ordering::Relaxed).to_string()) {
            error!("Failed to write hits file {}: {}", path.display(), e);
            return 1;
        }
    }

    if let Some(path) = &ready_file {
        let _ = std::fs::remove_file(path);
    }

    0
}

async fn accept_loop(listener: tokio::net::TcpListener, hits: Arc<AtomicUsize>) {
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response, StatusCode};
    use hyper_util::rt::TokioIo;

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let hits = hits.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::Relaxed);
                    let (status, body) = match req.uri().path() {
                        "/api/v1/maps" => (StatusCode::OK, r#"[{"id":"map1","name":"Map 1"}]"#),
                        "/api/v1/maps/map1" => (StatusCode::OK, r#"{"id":"map1","name":"Map 1","roads":[]}"#),
                        _ => (StatusCode::NOT_FOUND, r#"{"code":"mapNotFound"}"#),
                    };
                    debug!("{} {} -> {}", req.method(), req.uri().path(), status);
                    Response::builder()
                        .status(status)
                        .header("Content-Type", "application/json")
                        .body(Full::new(Bytes::from(body)))
                }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving connection: {}", e);
            }
        });
    }
}

async fn record(pid: u32, output: &Path, period: Duration) -> i32 {
    use std::io::Write;

    let mut file = match std::fs::File::create(output) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to create capture {}: {}", output.display(), e);
            return 1;
        }
    };
    info!("Recording PID {} into {}", pid, output.display());
    println!("[ perf record: Woken up 1 times to write data ]");

    let mut samples = 0u64;
    let sampling = async {
        loop {
            samples += 1;
            if let Err(e) = writeln!(file, "testexe;sample;pid_{} 1", pid) {
                error!("Failed to write sample: {}", e);
                return;
            }
            sleep(period).await;
        }
    };

    tokio::select! {
        _ = sampling => {}
        _ = wait_for_termination() => {}
    }

    info!("Recording stopped after {} samples", samples);
    if let Err(e) = file.flush() {
        error!("Failed to flush capture: {}", e);
        return 1;
    }
    0
}

fn atomic_write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "out".to_string());

    let tmp_path = path.with_file_name(format!("{file_name}.tmp-{pid}-{nanos}"));

    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received Ctrl+C");
}
