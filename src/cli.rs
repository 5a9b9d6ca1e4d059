// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `coplan`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "coplan",
    version,
    about = "Plan and run a pick-and-place job shared by a human and a robot.",
    long_about = None
)]
pub struct CliArgs {
    /// Built-in case to run (1 to 6).
    #[arg(value_name = "CASE", required_unless_present = "job", conflicts_with = "job")]
    pub case: Option<String>,

    /// Job description to run instead of a built-in case (JSON).
    #[arg(long, value_name = "PATH")]
    pub job: Option<PathBuf>,

    /// Solve and print the initial schedule without executing it.
    #[arg(long)]
    pub only_schedule: bool,

    /// Path to the config file (TOML). Built-in defaults when omitted.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Where to write the schedule or run artifact. Stdout when omitted.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `COPLAN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate the job and config, print them, don't solve.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
