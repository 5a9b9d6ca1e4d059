// src/job/task.rs

use serde::{Deserialize, Serialize};

use crate::errors::{CoplanError, Result};
use crate::types::{AgentKind, AgentRequirement, TaskId, TaskStatus};

/// What a task does: move `object` to `place`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub object: String,
    pub place: String,
}

/// Observed execution times of a finished task.
///
/// `total` is the absolute completion time; the phases are durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub total: i64,
    pub preparation: i64,
    pub execution: i64,
    pub completion: i64,
}

/// When a task finishes: a plan value or an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    Planned(i64),
    Observed(Timing),
}

impl Finish {
    /// Absolute finish time.
    pub fn time(&self) -> i64 {
        match self {
            Finish::Planned(t) => *t,
            Finish::Observed(timing) => timing.total,
        }
    }
}

/// A unit of work inside a [`Job`](crate::job::Job).
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub action: Action,
    pub conditions: Vec<TaskId>,
    pub requirement: AgentRequirement,
    /// Current assignment. Known from creation for fixed tasks; set by the
    /// first plan for universal ones.
    pub assigned: Option<AgentKind>,
    status: TaskStatus,
    pub start: Option<i64>,
    pub finish: Option<Finish>,
}

impl Task {
    pub fn new(
        id: TaskId,
        action: Action,
        conditions: Vec<TaskId>,
        requirement: AgentRequirement,
    ) -> Self {
        let status = if conditions.is_empty() {
            TaskStatus::Available
        } else {
            TaskStatus::Blocked
        };
        Self {
            id,
            action,
            conditions,
            requirement,
            assigned: requirement.fixed_agent(),
            status,
            start: None,
            finish: None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Move to `next`, refusing moves outside the status table.
    pub fn set_status(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoplanError::InvalidTransition {
                task: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn is_universal(&self) -> bool {
        self.requirement.is_universal()
    }

    pub fn finish_time(&self) -> Option<i64> {
        self.finish.as_ref().map(Finish::time)
    }

    pub fn duration(&self) -> Option<i64> {
        Some(self.finish_time()? - self.start?)
    }

    /// Percentage of the planned duration elapsed at `now`, in `[0, 100]`.
    pub fn progress(&self, now: i64) -> f64 {
        let (Some(start), Some(duration)) = (self.start, self.duration()) else {
            return 0.0;
        };
        if duration <= 0 {
            return 100.0;
        }
        let pct = (now - start) as f64 / duration as f64 * 100.0;
        (pct.clamp(0.0, 100.0) * 100.0).round() / 100.0
    }
}
