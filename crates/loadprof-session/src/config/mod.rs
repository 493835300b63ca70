use anyhow::{Context, Result};
use loadprof_common::CommandLine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod validation;

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub profiler: ProfilerConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Target server lifecycle options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Launch command; the CLI positional argument takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandLine>,

    /// Fixed delay between server spawn and profiler attach
    #[serde(default = "default_warm_up", with = "duration_serde")]
    pub warm_up: Duration,

    /// Delay between server stop and profiler stop
    #[serde(default = "default_settle", with = "duration_serde")]
    pub settle: Duration,

    /// How long to wait for a stopped process to exit before force killing it
    #[serde(default = "default_graceful_timeout", with = "duration_serde")]
    pub graceful_timeout: Duration,

    /// Optional readiness probe run after the warm-up delay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness: Option<ReadinessConfig>,
}

/// Readiness probe options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    pub endpoint: String,
    #[serde(default = "default_probe_interval", with = "duration_serde")]
    pub interval: Duration,
    #[serde(default = "default_probe_attempt_timeout", with = "duration_serde")]
    pub attempt_timeout: Duration,
    #[serde(default = "default_probe_max_wait", with = "duration_serde")]
    pub max_wait: Duration,
}

/// Synthetic load options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,
    #[serde(default = "default_shots")]
    pub shots: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_random_limit")]
    pub random_limit: u64,
    #[serde(default = "default_cooldown", with = "duration_serde")]
    pub cooldown: Duration,
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

/// How the profiler's capture window ends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptureModeKind {
    /// Open-ended capture, signalled at teardown
    #[default]
    ExplicitStop,
    /// Self-terminating capture of `capture_duration`
    FixedDuration,
}

/// Profiler options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilerConfig {
    /// Command template; `{pid}`, `{output}` and `{frequency}` are substituted
    #[serde(default = "default_profiler_command")]
    pub command: CommandLine,
    #[serde(default = "default_frequency")]
    pub frequency: u32,
    #[serde(default = "default_capture_path")]
    pub capture_path: PathBuf,
    #[serde(default)]
    pub mode: CaptureModeKind,
    /// Capture window for `fixed_duration` mode
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "option_duration_serde"
    )]
    pub capture_duration: Option<Duration>,
    /// Appended to the command in `fixed_duration` mode; `{seconds}` is substituted
    #[serde(default = "default_duration_args")]
    pub duration_args: Vec<String>,
}

/// Report pipeline options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Reads the capture (`{capture}`) and writes raw stacks to stdout
    #[serde(default = "default_export")]
    pub export: CommandLine,
    #[serde(default = "default_collapse")]
    pub collapse: CommandLine,
    #[serde(default = "default_render")]
    pub render: CommandLine,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl HarnessConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: HarnessConfig = serde_yaml::from_str(content)
            .context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerConfig::default(),
            load: LoadConfig::default(),
            profiler: ProfilerConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: None,
            warm_up: default_warm_up(),
            settle: default_settle(),
            graceful_timeout: default_graceful_timeout(),
            readiness: None,
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            shots: default_shots(),
            seed: default_seed(),
            random_limit: default_random_limit(),
            cooldown: default_cooldown(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            command: default_profiler_command(),
            frequency: default_frequency(),
            capture_path: default_capture_path(),
            mode: CaptureModeKind::default(),
            capture_duration: None,
            duration_args: default_duration_args(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            export: default_export(),
            collapse: default_collapse(),
            render: default_render(),
            output: default_output(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_warm_up() -> Duration {
    Duration::from_secs(1)
}

fn default_settle() -> Duration {
    Duration::from_secs(1)
}

fn default_graceful_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_probe_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_probe_attempt_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_probe_max_wait() -> Duration {
    Duration::from_secs(10)
}

fn default_targets() -> Vec<String> {
    vec![
        "http://localhost:8080/api/v1/maps/map1".to_string(),
        "http://localhost:8080/api/v1/maps".to_string(),
    ]
}

fn default_shots() -> usize {
    100
}

fn default_seed() -> u64 {
    loadprof_load::DEFAULT_SEED
}

fn default_random_limit() -> u64 {
    1000
}

fn default_cooldown() -> Duration {
    Duration::from_millis(100)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_profiler_command() -> CommandLine {
    CommandLine::new(
        "perf",
        ["record", "-F", "{frequency}", "-p", "{pid}", "-g", "-o", "{output}"]
            .into_iter()
            .map(String::from)
            .collect(),
    )
}

fn default_frequency() -> u32 {
    99
}

fn default_capture_path() -> PathBuf {
    PathBuf::from("perf.data")
}

fn default_duration_args() -> Vec<String> {
    vec!["--".to_string(), "sleep".to_string(), "{seconds}".to_string()]
}

fn default_export() -> CommandLine {
    CommandLine::new("perf", vec!["script".to_string(), "-i".to_string(), "{capture}".to_string()])
}

fn default_collapse() -> CommandLine {
    CommandLine::new("./FlameGraph/stackcollapse-perf.pl", Vec::new())
}

fn default_render() -> CommandLine {
    CommandLine::new("./FlameGraph/flamegraph.pl", Vec::new())
}

fn default_output() -> PathBuf {
    PathBuf::from("graph.svg")
}

// Custom serialization for Duration
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(crate) fn format_duration(duration: &Duration) -> String {
        if duration.subsec_millis() == 0 {
            format!("{}s", duration.as_secs())
        } else {
            format!("{}ms", duration.as_millis())
        }
    }

    pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        // Check for "ms" BEFORE "s" since "ms" ends with 's'
        if let Some(num_str) = s.strip_suffix("ms") {
            let millis: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_millis(millis))
        } else if let Some(num_str) = s.strip_suffix('s') {
            let secs: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else if let Some(num_str) = s.strip_suffix('m') {
            let mins: u64 = num_str.parse().map_err(|_| format!("Invalid duration: {}", s))?;
            let secs = mins
                .checked_mul(60)
                .ok_or_else(|| format!("Duration out of range: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else {
            Err(format!("Duration must end with 's', 'ms', or 'm': {}", s))
        }
    }
}

// Custom serialization for Option<Duration>
mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&super::duration_serde::format_duration(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        match opt {
            Some(s) => super::duration_serde::parse_duration(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
