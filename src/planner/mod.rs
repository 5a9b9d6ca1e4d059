// src/planner/mod.rs

//! Scheduling engine.
//!
//! - [`engine`] builds the constraint model of a job, solves it, freezes
//!   realized facts and runs what-if reassignments.
//! - [`model`] records variables and constraints so they can be edited
//!   between solves.
//! - [`backend`] lowers the active model onto Pumpkin and minimises it.
//! - [`registry`] keeps the handles of the pairwise border constraints so a
//!   realized task's constraints can be removed exactly once.

pub mod backend;
pub mod engine;
pub mod model;
pub mod registry;

use std::time::Duration;

use crate::types::{AgentKind, TaskId};

pub use backend::{SearchLimits, SolveOutcome, SolveStats, SolveStatus};
pub use engine::SchedulingEngine;
pub use model::{ConstraintId, LinearConstraint, Literal, Scenario, ScheduleModel, VarId};
pub use registry::{BorderSlot, ConstraintRegistry};

/// Search steps per solve when `[solver].max_nodes` is not set. Keeps
/// schedules independent of machine speed.
pub const DEFAULT_MAX_NODES: u64 = 50_000;

/// Tunables of the engine, taken from `[planner]` and `[solver]`.
#[derive(Debug, Clone, Copy)]
pub struct PlannerOptions {
    /// Scale of the rejection cost relative to the makespan.
    pub rejection_weight: f64,
    /// Integer resolution of the rejection cost.
    pub rejection_resolution: i64,
    pub solve_limits: SearchLimits,
    pub what_if_limits: SearchLimits,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            rejection_weight: 1.0,
            rejection_resolution: 10,
            solve_limits: SearchLimits {
                max_time: Duration::from_secs(2),
                max_nodes: Some(DEFAULT_MAX_NODES),
            },
            what_if_limits: SearchLimits {
                max_time: Duration::from_millis(500),
                max_nodes: Some(DEFAULT_MAX_NODES),
            },
        }
    }
}

/// Result of a successful solve.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Human queue ordered by planned start.
    pub human: Vec<TaskId>,
    /// Robot queue ordered by planned start.
    pub robot: Vec<TaskId>,
    pub status: SolveStatus,
    pub objective: i64,
    pub makespan: i64,
    pub stats: SolveStats,
}

impl Plan {
    pub fn queue(&self, agent: AgentKind) -> &[TaskId] {
        match agent {
            AgentKind::Human => &self.human,
            AgentKind::Robot => &self.robot,
        }
    }
}

/// One evaluated what-if: `task` moved to the asking agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reassignment {
    pub task: TaskId,
    pub objective: i64,
    pub makespan: i64,
}
