use super::*;
use anyhow::{anyhow, Result};
use loadprof_load::TargetCatalog;

/// Validate the complete configuration
pub fn validate_config(config: &HarnessConfig) -> Result<()> {
    validate_log_level(&config.log_level)?;
    validate_server_config(&config.server)?;
    validate_load_config(&config.load)?;
    validate_profiler_config(&config.profiler, &config.load)?;
    validate_report_config(&config.report)?;

    Ok(())
}

fn validate_log_level(log_level: &str) -> Result<()> {
    match log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(anyhow!(
            "Invalid log level: {}, must be one of: trace, debug, info, warn, error",
            log_level
        )),
    }
}

/// Validate server lifecycle options
fn validate_server_config(server: &ServerConfig) -> Result<()> {
    if server.graceful_timeout.is_zero() {
        return Err(anyhow!("Graceful timeout must be greater than 0"));
    }

    if let Some(ref readiness) = server.readiness {
        TargetCatalog::new([readiness.endpoint.as_str()])
            .map_err(|e| anyhow!("Invalid readiness endpoint: {}", e))?;

        if readiness.interval.is_zero() {
            return Err(anyhow!("Readiness interval must be greater than 0"));
        }
        if readiness.attempt_timeout.is_zero() {
            return Err(anyhow!("Readiness attempt timeout must be greater than 0"));
        }
        if readiness.max_wait < readiness.interval {
            return Err(anyhow!(
                "Readiness max_wait ({:?}) must be at least the probe interval ({:?})",
                readiness.max_wait,
                readiness.interval
            ));
        }
    }

    Ok(())
}

/// Validate load options
fn validate_load_config(load: &LoadConfig) -> Result<()> {
    let catalog = TargetCatalog::new(load.targets.iter().map(String::as_str))?;

    if load.random_limit <= catalog.len() as u64 {
        return Err(anyhow!(
            "random_limit ({}) must be greater than the number of targets ({})",
            load.random_limit,
            catalog.len()
        ));
    }

    if load.request_timeout.is_zero() {
        return Err(anyhow!("Request timeout must be greater than 0"));
    }

    Ok(())
}

/// Validate profiler options
fn validate_profiler_config(profiler: &ProfilerConfig, load: &LoadConfig) -> Result<()> {
    if !profiler.command.references("pid") {
        return Err(anyhow!(
            "Profiler command must reference {{pid}}: {}",
            profiler.command
        ));
    }

    if profiler.frequency == 0 {
        return Err(anyhow!("Profiler frequency must be greater than 0"));
    }

    if profiler.capture_path.as_os_str().is_empty() {
        return Err(anyhow!("Profiler capture_path cannot be empty"));
    }

    match profiler.mode {
        CaptureModeKind::ExplicitStop => {
            if profiler.capture_duration.is_some() {
                return Err(anyhow!(
                    "capture_duration is only valid with mode: fixed_duration"
                ));
            }
        }
        CaptureModeKind::FixedDuration => {
            let duration = profiler
                .capture_duration
                .ok_or_else(|| anyhow!("capture_duration is required for mode: fixed_duration"))?;

            // Worst case: every shot runs into its request timeout.
            let per_shot = load.cooldown.saturating_add(load.request_timeout);
            let minimum = per_shot.saturating_mul(load.shots.min(u32::MAX as usize) as u32);
            if duration < minimum {
                return Err(anyhow!(
                    "capture_duration ({:?}) is shorter than the worst-case load phase ({} shots x ({:?} cooldown + {:?} request_timeout) = {:?})",
                    duration,
                    load.shots,
                    load.cooldown,
                    load.request_timeout,
                    minimum
                ));
            }

            if !profiler.duration_args.iter().any(|arg| arg.contains("{seconds}")) {
                return Err(anyhow!(
                    "duration_args must reference {{seconds}} for mode: fixed_duration"
                ));
            }
        }
    }

    Ok(())
}

/// Validate report pipeline options
fn validate_report_config(report: &ReportConfig) -> Result<()> {
    if report.output.as_os_str().is_empty() {
        return Err(anyhow!("Report output path cannot be empty"));
    }

    Ok(())
}
