// src/lib.rs

pub mod cli;
pub mod config;
pub mod control;
pub mod errors;
pub mod job;
pub mod logging;
pub mod planner;
pub mod sim;
pub mod types;

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_or_default;
use crate::control::{ControlLoop, Runtime};
use crate::job::{Case, Job, Task, cases, input};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - job generation or loading
/// - the initial solve
/// - the control loop and its async shell
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref())?;
    let tasks = load_tasks(&args, &cfg)?;
    let job = Job::new(tasks)?;

    if args.dry_run {
        print_dry_run(&cfg, &job);
        return Ok(());
    }

    let control = ControlLoop::new(job, cfg.workers(), cfg.acceptance(), cfg.planner_options())?;

    if args.only_schedule {
        let json = serde_json::to_string_pretty(control.initial_export())?;
        emit(args.output.as_deref(), &json).await?;
        return Ok(());
    }

    // The runtime writes the artifact itself when an output path is set.
    let runtime = Runtime::new(control, args.output.clone());
    let artifact = runtime.run().await?;
    if args.output.is_none() {
        println!("{}", artifact.to_json()?);
    }
    Ok(())
}

/// Built-in case from the positional argument, or the `--job` file.
fn load_tasks(args: &CliArgs, cfg: &ConfigFile) -> Result<Vec<Task>> {
    if let Some(path) = &args.job {
        info!(path = %path.display(), "loading job description");
        return Ok(input::load_job(path)?);
    }

    let selector = args.case.as_deref().unwrap_or_default();
    let case: Case = selector.parse()?;
    let extra = config::validate::out_of_case_keys(cfg);
    if !extra.is_empty() {
        warn!(?extra, "rejection probabilities for ids outside the case are ignored");
    }
    info!(case = case.number(), seed = cfg.simulation.seed, "generating case");
    Ok(cases::generate(case, cfg.simulation.seed, cfg.allocation_weights())?)
}

async fn emit(output: Option<&Path>, contents: &str) -> Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, contents).await?;
            info!(path = %path.display(), "schedule written");
        }
        None => println!("{contents}"),
    }
    Ok(())
}

/// Simple dry-run output: print the settings and the tasks.
fn print_dry_run(cfg: &ConfigFile, job: &Job) {
    println!("coplan dry-run");
    println!("  simulation.seed = {}", cfg.simulation.seed);
    println!(
        "  simulation.fail_probability = {}",
        cfg.simulation.fail_probability
    );
    println!(
        "  planner.rejection_weight = {}",
        cfg.planner.rejection_weight
    );
    println!("  solver.max_time_ms = {}", cfg.solver.max_time_ms);
    println!("  solver.max_nodes = {}", cfg.solver.max_nodes);
    println!();

    println!("tasks ({}):", job.len());
    for task in job.tasks() {
        println!(
            "  - {:>2} {} -> {} ({:?})",
            task.id, task.action.object, task.action.place, task.requirement
        );
        if !task.conditions.is_empty() {
            println!("      after: {:?}", task.conditions);
        }
    }

    debug!("dry-run complete (no solve)");
}
