// src/logging.rs

//! Logging setup for `stepwise` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `STEPWISE_LOG` environment variable: a level name ("info", "debug") or
//!    full `EnvFilter` directives ("info,stepwise::dag=debug")
//! 3. default to `info`
//!
//! A bare level keeps `sqlx` at `warn`, so per-query logs only show when
//! asked for by directive. Logs are sent to STDERR so that command stdout
//! carries only JSON output.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

const ENV_VAR: &str = "STEPWISE_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(ENV_VAR).ok();
    let filter = filter_for(cli_level, env.as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}

fn filter_for(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(lvl) = cli_level {
        return level_filter(level_name(lvl));
    }

    let Some(env) = env.map(str::trim).filter(|s| !s.is_empty()) else {
        return level_filter("info");
    };

    match parse_level_str(env) {
        Some(level) => level_filter(level),
        None => EnvFilter::try_new(env).unwrap_or_else(|_| level_filter("info")),
    }
}

fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("{level},sqlx=warn"))
}

fn level_name(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn parse_level_str(s: &str) -> Option<&'static str> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some("error"),
        "warn" | "warning" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}
