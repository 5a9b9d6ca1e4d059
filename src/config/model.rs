// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::job::AllocationWeights;
use crate::planner::{DEFAULT_MAX_NODES, PlannerOptions, SearchLimits};
use crate::sim::{
    DEFAULT_REJECTION_PROBABILITY, SimulatedAcceptance, SimulatedWorkers, default_rejection_table,
};
use crate::types::TaskId;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [simulation]
/// seed = 7
/// fail_probability = 0.1
/// allocation_weights = [0.3, 0.3, 0.4]
/// default_rejection_probability = 0.2
///
/// [simulation.rejection_probabilities]
/// "3" = 0.8
///
/// [planner]
/// rejection_weight = 1.0
/// rejection_resolution = 10
///
/// [solver]
/// max_time_ms = 2000
/// what_if_max_time_ms = 500
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub simulation: SimulationSection,

    #[serde(default)]
    pub planner: PlannerSection,

    #[serde(default)]
    pub solver: SolverSection,
}

/// Validated configuration.
///
/// Construct through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub simulation: SimulationSection,
    pub planner: PlannerSection,
    pub solver: SolverSection,
}

impl ConfigFile {
    /// Build without validating. Prefer `ConfigFile::try_from`.
    pub(crate) fn new_unchecked(
        simulation: SimulationSection,
        planner: PlannerSection,
        solver: SolverSection,
    ) -> Self {
        Self {
            simulation,
            planner,
            solver,
        }
    }

    pub fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            rejection_weight: self.planner.rejection_weight,
            rejection_resolution: self.planner.rejection_resolution,
            solve_limits: SearchLimits {
                max_time: Duration::from_millis(self.solver.max_time_ms),
                max_nodes: Some(self.solver.max_nodes),
            },
            what_if_limits: SearchLimits {
                max_time: Duration::from_millis(self.solver.what_if_max_time_ms),
                max_nodes: Some(self.solver.max_nodes),
            },
        }
    }

    pub fn allocation_weights(&self) -> AllocationWeights {
        let [human, robot, allocable] = self.simulation.allocation_weights;
        AllocationWeights {
            human,
            robot,
            allocable,
        }
    }

    pub fn workers(&self) -> SimulatedWorkers {
        SimulatedWorkers::new(self.simulation.seed, self.simulation.fail_probability)
    }

    /// Acceptance oracle with the built-in table overlaid by the configured
    /// per-task probabilities.
    pub fn acceptance(&self) -> SimulatedAcceptance {
        let mut table = default_rejection_table();
        for (key, p) in &self.simulation.rejection_probabilities {
            if let Ok(id) = key.trim().parse::<TaskId>() {
                table.insert(id, *p);
            }
        }
        SimulatedAcceptance::new(
            self.simulation.seed,
            table,
            self.simulation.default_rejection_probability,
        )
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.simulation, raw.planner, raw.solver)
    }
}

/// `[simulation]` section: the seeded worker oracles and case generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    #[serde(default)]
    pub seed: u64,

    /// Chance that a task runs in the delayed mode.
    #[serde(default = "default_fail_probability")]
    pub fail_probability: f64,

    /// `[human, robot, allocable]` cube weights for cases 4 to 6.
    #[serde(default = "default_allocation_weights")]
    pub allocation_weights: [f64; 3],

    /// Per-task rejection probabilities, keyed by task id.
    #[serde(default)]
    pub rejection_probabilities: BTreeMap<String, f64>,

    /// Used for tasks missing from the table.
    #[serde(default = "default_rejection_probability")]
    pub default_rejection_probability: f64,
}

fn default_fail_probability() -> f64 {
    0.1
}

fn default_allocation_weights() -> [f64; 3] {
    let w = AllocationWeights::default();
    [w.human, w.robot, w.allocable]
}

fn default_rejection_probability() -> f64 {
    DEFAULT_REJECTION_PROBABILITY
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            seed: 0,
            fail_probability: default_fail_probability(),
            allocation_weights: default_allocation_weights(),
            rejection_probabilities: BTreeMap::new(),
            default_rejection_probability: default_rejection_probability(),
        }
    }
}

/// `[planner]` section: objective shaping.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlannerSection {
    #[serde(default = "default_rejection_weight")]
    pub rejection_weight: f64,

    #[serde(default = "default_rejection_resolution")]
    pub rejection_resolution: i64,
}

fn default_rejection_weight() -> f64 {
    1.0
}

fn default_rejection_resolution() -> i64 {
    10
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            rejection_weight: default_rejection_weight(),
            rejection_resolution: default_rejection_resolution(),
        }
    }
}

/// `[solver]` section: search budgets.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverSection {
    /// Wall-clock budget of a full solve.
    #[serde(default = "default_max_time_ms")]
    pub max_time_ms: u64,

    /// Wall-clock budget of each what-if solve.
    #[serde(default = "default_what_if_max_time_ms")]
    pub what_if_max_time_ms: u64,

    /// Cap on search steps per solve. Hitting it before the time budget
    /// makes the returned schedule reproducible.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: u64,
}

fn default_max_time_ms() -> u64 {
    2000
}

fn default_what_if_max_time_ms() -> u64 {
    500
}

fn default_max_nodes() -> u64 {
    DEFAULT_MAX_NODES
}

impl Default for SolverSection {
    fn default() -> Self {
        Self {
            max_time_ms: default_max_time_ms(),
            what_if_max_time_ms: default_what_if_max_time_ms(),
            max_nodes: default_max_nodes(),
        }
    }
}
