// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CoplanError, Result};
use crate::job::CASE_LENGTH;
use crate::types::TaskId;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::CoplanError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.simulation, raw.planner, raw.solver))
    }
}

/// Validate an already-parsed raw config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg)
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_simulation(cfg)?;
    validate_planner(cfg)?;
    validate_solver(cfg)?;
    Ok(())
}

fn validate_simulation(cfg: &RawConfigFile) -> Result<()> {
    let sim = &cfg.simulation;
    ensure_probability("[simulation].fail_probability", sim.fail_probability)?;
    ensure_probability(
        "[simulation].default_rejection_probability",
        sim.default_rejection_probability,
    )?;

    for (key, p) in &sim.rejection_probabilities {
        if key.trim().parse::<TaskId>().is_err() {
            return Err(CoplanError::ConfigError(format!(
                "[simulation.rejection_probabilities] key '{key}' is not a task id"
            )));
        }
        ensure_probability(&format!("[simulation.rejection_probabilities].{key}"), *p)?;
    }

    validate_allocation_weights(sim.allocation_weights)
}

fn validate_allocation_weights(weights: [f64; 3]) -> Result<()> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(CoplanError::ConfigError(format!(
            "[simulation].allocation_weights must be non-negative (got {weights:?})"
        )));
    }
    if weights.iter().all(|w| *w == 0.0) {
        return Err(CoplanError::ConfigError(
            "[simulation].allocation_weights must not all be zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_planner(cfg: &RawConfigFile) -> Result<()> {
    let planner = &cfg.planner;
    if !planner.rejection_weight.is_finite() || planner.rejection_weight < 0.0 {
        return Err(CoplanError::ConfigError(format!(
            "[planner].rejection_weight must be >= 0 (got {})",
            planner.rejection_weight
        )));
    }
    if planner.rejection_resolution <= 0 {
        return Err(CoplanError::ConfigError(format!(
            "[planner].rejection_resolution must be >= 1 (got {})",
            planner.rejection_resolution
        )));
    }
    Ok(())
}

fn validate_solver(cfg: &RawConfigFile) -> Result<()> {
    let solver = &cfg.solver;
    ensure_positive("[solver].max_time_ms", solver.max_time_ms)?;
    ensure_positive("[solver].what_if_max_time_ms", solver.what_if_max_time_ms)?;
    ensure_positive("[solver].max_nodes", solver.max_nodes)?;
    Ok(())
}

fn ensure_probability(field: &str, p: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(CoplanError::ConfigError(format!(
            "{field} must be within [0, 1] (got {p})"
        )));
    }
    Ok(())
}

fn ensure_positive(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(CoplanError::ConfigError(format!("{field} must be >= 1 (got 0)")));
    }
    Ok(())
}

/// Keys of the rejection table beyond the built-in cases only make sense
/// for job files with that many tasks.
pub(crate) fn out_of_case_keys(cfg: &ConfigFile) -> Vec<String> {
    cfg.simulation
        .rejection_probabilities
        .keys()
        .filter(|key| {
            key.trim()
                .parse::<TaskId>()
                .is_ok_and(|id| id >= CASE_LENGTH)
        })
        .cloned()
        .collect()
}
