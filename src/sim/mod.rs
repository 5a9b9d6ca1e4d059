// src/sim/mod.rs

//! Oracles standing in for the physical workers.
//!
//! The control loop only sees the two traits below; [`SimulatedWorkers`] and
//! [`SimulatedAcceptance`] are the seeded implementations used by the binary.

pub mod acceptance;
pub mod durations;

use crate::job::{Job, Task, Timing};
use crate::types::{AgentKind, Question, TaskId};

pub use acceptance::{DEFAULT_REJECTION_PROBABILITY, SimulatedAcceptance, default_rejection_table};
pub use durations::{SimulatedWorkers, nominal_phases};

/// Durations of the three phases of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseDurations {
    /// Reach the object and grasp it.
    pub preparation: i64,
    /// Carry it to the place and release it.
    pub execution: i64,
    /// Return home.
    pub completion: i64,
}

impl PhaseDurations {
    pub fn total(&self) -> i64 {
        self.preparation + self.execution + self.completion
    }
}

/// What a busy worker is doing at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Nothing was started for this worker.
    Idle,
    Preparation,
    Execution,
    Completion,
    /// Holding the object while the coworker finishes a prerequisite; the
    /// value is how long it has waited so far.
    Waiting(i64),
    Completed(Timing),
}

/// Task durations per worker, plus the live state of started tasks.
pub trait DurationOracle {
    /// Expected phase durations of `task` for `agent`. All zero when the
    /// worker cannot handle the task's object.
    fn estimate(&self, task: &Task, agent: AgentKind) -> PhaseDurations;

    /// `agent` starts `task` at `now`.
    fn begin(&mut self, job: &Job, task: TaskId, agent: AgentKind, now: i64);

    /// Status of the task `agent` is executing.
    fn query(&mut self, job: &Job, agent: AgentKind, now: i64) -> ExecutionStatus;
}

/// Accept/decline answers of the workers.
pub trait AcceptanceOracle {
    /// Probability that the human declines `task`.
    fn reject_probability(&self, task: &Task) -> f64;

    /// Ask `agent` the `question` about `task`.
    fn ask(&mut self, question: Question, task: &Task, agent: AgentKind) -> bool;
}
