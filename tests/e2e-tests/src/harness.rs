//! loadprof wrapper for E2E testing

use crate::{get_loadprof_path, get_testexe_path};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Knobs for one harness run against the testexe map server.
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub port: u16,
    pub shots: usize,
    pub cooldown_ms: u64,
    pub warm_up_ms: u64,
    pub readiness: bool,
    /// Server command; defaults to `testexe serve` on `port`
    pub server: Option<String>,
    pub export: String,
    pub collapse: String,
    pub render: String,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            port: 0,
            shots: 10,
            cooldown_ms: 20,
            warm_up_ms: 1000,
            readiness: false,
            server: None,
            export: "cat {capture}".to_string(),
            collapse: "sort".to_string(),
            render: "cat".to_string(),
        }
    }
}

/// How a finished run went.
#[derive(Debug)]
pub struct RunOutcome {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutcome {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn has_log_matching(&self, pattern: &str) -> bool {
        self.stderr.lines().any(|line| line.contains(pattern))
    }
}

/// One loadprof invocation inside a scratch directory.
pub struct LoadprofRun {
    process: Option<Child>,
    pub test_dir: PathBuf,
    config_path: PathBuf,
    server: String,
}

impl LoadprofRun {
    /// Write the YAML config for `options` into `test_dir`.
    pub fn new(test_dir: PathBuf, options: &HarnessOptions) -> Self {
        let testexe = get_testexe_path();
        let config_path = test_dir.join("loadprof.yaml");

        let server = options.server.clone().unwrap_or_else(|| {
            format!(
                "'{}' serve --port {} --ready-file ready --hits-file hits.txt",
                testexe.display(),
                options.port
            )
        });

        let readiness = if options.readiness {
            format!(
                "  readiness:\n    endpoint: http://127.0.0.1:{}/api/v1/maps\n    interval: 50ms\n    max_wait: 10s\n",
                options.port
            )
        } else {
            String::new()
        };

        let config = format!(
            r#"log_level: info
server:
  warm_up: {warm_up}ms
  settle: 100ms
  graceful_timeout: 5s
{readiness}load:
  targets:
    - http://127.0.0.1:{port}/api/v1/maps/map1
    - http://127.0.0.1:{port}/api/v1/maps
  shots: {shots}
  cooldown: {cooldown}ms
  request_timeout: 2s
profiler:
  command: "'{testexe}' record --pid {{pid}} --output {{output}} --period-ms 20"
  capture_path: perf.data
report:
  export: "{export}"
  collapse: "{collapse}"
  render: "{render}"
  output: graph.svg
"#,
            warm_up = options.warm_up_ms,
            readiness = readiness,
            port = options.port,
            shots = options.shots,
            cooldown = options.cooldown_ms,
            testexe = testexe.display(),
            export = options.export,
            collapse = options.collapse,
            render = options.render,
        );

        fs::write(&config_path, config).expect("Failed to write loadprof config");

        Self {
            process: None,
            test_dir,
            config_path,
            server,
        }
    }

    /// Start loadprof with the written config.
    pub fn start(&mut self, extra_args: &[&str]) -> Result<(), String> {
        if self.process.is_some() {
            return Err("loadprof is already running".to_string());
        }

        let loadprof = get_loadprof_path();
        println!("Starting loadprof: {}", loadprof.display());
        println!("Server: {}", self.server);
        println!("Working dir: {}", self.test_dir.display());

        let stdout = fs::File::create(self.test_dir.join("stdout.log"))
            .map_err(|e| format!("Failed to create stdout log: {}", e))?;
        let stderr = fs::File::create(self.test_dir.join("stderr.log"))
            .map_err(|e| format!("Failed to create stderr log: {}", e))?;

        let child = Command::new(&loadprof)
            .arg(&self.server)
            .arg("--config")
            .arg(&self.config_path)
            .args(extra_args)
            .current_dir(&self.test_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| format!("Failed to spawn loadprof: {}", e))?;

        println!("loadprof started with PID: {}", child.id());
        self.process = Some(child);
        Ok(())
    }

    /// Wait for loadprof to finish on its own.
    pub fn wait(&mut self, timeout: Duration) -> Result<RunOutcome, String> {
        let mut child = self
            .process
            .take()
            .ok_or_else(|| "loadprof is not running".to_string())?;

        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                println!("loadprof did not exit in time, forcing kill");
                child.kill().ok();
                child.wait().ok();
                return Err(format!("loadprof did not finish within {} seconds", timeout.as_secs()));
            }
            Err(e) => return Err(format!("Error waiting for loadprof: {}", e)),
        };

        let outcome = RunOutcome {
            status,
            stdout: self.read_file("stdout.log"),
            stderr: self.read_file("stderr.log"),
        };
        println!("loadprof exited with status: {}", outcome.status);
        for line in outcome.stderr.lines() {
            println!("[LOADPROF] {}", line);
        }
        Ok(outcome)
    }

    /// Send SIGTERM to loadprof.
    #[cfg(unix)]
    pub fn interrupt(&mut self) -> Result<(), String> {
        let child = self
            .process
            .as_ref()
            .ok_or_else(|| "loadprof is not running".to_string())?;

        println!("Sending termination signal to loadprof...");
        nix::sys::signal::kill(
            nix::unistd::Pid::from_raw(child.id() as i32),
            nix::sys::signal::Signal::SIGTERM,
        )
        .map_err(|e| format!("Failed to send SIGTERM: {}", e))
    }

    /// Poll until `name` exists inside the test directory.
    pub fn wait_for_file(&self, name: &str, timeout: Duration) -> Result<PathBuf, String> {
        let path = self.test_dir.join(name);
        let start = Instant::now();

        while start.elapsed() < timeout {
            if path.exists() {
                return Ok(path);
            }
            thread::sleep(Duration::from_millis(25));
        }

        Err(format!("{} did not appear within {} seconds", name, timeout.as_secs()))
    }

    /// Poll loadprof's stderr log until a line contains `pattern`.
    pub fn wait_for_log(&self, pattern: &str, timeout: Duration) -> Result<(), String> {
        let start = Instant::now();

        while start.elapsed() < timeout {
            if self.read_file("stderr.log").lines().any(|line| line.contains(pattern)) {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(25));
        }

        Err(format!("'{}' was not logged within {} seconds", pattern, timeout.as_secs()))
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.test_dir.join(name)
    }

    fn read_file(&self, name: &str) -> String {
        fs::read_to_string(self.test_dir.join(name)).unwrap_or_default()
    }
}

impl Drop for LoadprofRun {
    fn drop(&mut self) {
        if let Some(mut child) = self.process.take() {
            child.kill().ok();
            child.wait().ok();
        }
    }
}

/// Read a small text file written by testexe.
pub fn read_trimmed(path: &Path) -> String {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
