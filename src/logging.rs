// src/logging.rs

//! `tracing` subscriber for the binary.
//!
//! The filter comes from, in order:
//! 1. `--log-level` (applies to every target),
//! 2. `COPLAN_LOG`, which takes full directives such as
//!    `info,coplan::planner::backend=debug`,
//! 3. `info`.
//!
//! Per-round search traces stay off unless a directive names
//! `coplan::planner::backend` explicitly. Output goes to stderr; stdout
//! carries only the schedule or the run artifact.

use anyhow::{Result, anyhow};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

const ENV_VAR: &str = "COPLAN_LOG";
const SOLVER_TARGET: &str = "coplan::planner::backend";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(ENV_VAR).ok().as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

/// Filter for the given CLI level and `COPLAN_LOG` value.
pub fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    let directives = match (cli_level, env.map(str::trim)) {
        (Some(level), _) => level_filter(level).to_string(),
        (None, Some(env)) if !env.is_empty() => env.to_string(),
        _ => LevelFilter::INFO.to_string(),
    };

    let mut filter = EnvFilter::builder()
        .parse(&directives)
        .map_err(|e| anyhow!("invalid {ENV_VAR} directives '{directives}': {e}"))?;

    let traces_everything = filter.max_level_hint() == Some(LevelFilter::TRACE);
    if traces_everything && !directives.contains(SOLVER_TARGET) {
        let quiet = format!("{SOLVER_TARGET}=debug")
            .parse::<Directive>()
            .map_err(|e| anyhow!("invalid solver directive: {e}"))?;
        filter = filter.add_directive(quiet);
    }
    Ok(filter)
}

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}
