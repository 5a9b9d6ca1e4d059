// src/job/mod.rs

//! Tasks, the job that owns them, and the ways a job is produced or shown.
//!
//! - [`task`] defines a single task and its timing.
//! - [`graph`] holds the dependency graph used for look-ups and validation.
//! - [`cases`] generates the built-in cases.
//! - [`input`] loads JSON job descriptions.
//! - [`export`] turns a job into the schedule export and run artifact.

pub mod cases;
pub mod export;
pub mod graph;
pub mod input;
pub mod task;

use std::collections::BTreeSet;

use tracing::debug;

use crate::errors::{CoplanError, Result};
use crate::types::{TaskId, TaskStatus};

pub use cases::{AllocationWeights, CASE_LENGTH, Case};
pub use export::{ExportRow, RunArtifact, ScheduleExport};
pub use graph::DependencyGraph;
pub use task::{Action, Finish, Task, Timing};

/// A fixed set of tasks plus their execution state.
#[derive(Debug, Clone)]
pub struct Job {
    tasks: Vec<Task>,
    completed: BTreeSet<TaskId>,
    in_progress: BTreeSet<TaskId>,
    graph: DependencyGraph,
}

impl Job {
    /// Build a job, validating ids and conditions.
    pub fn new(tasks: Vec<Task>) -> Result<Self> {
        if tasks.is_empty() {
            return Err(CoplanError::InvalidJob(
                "job must contain at least one task".to_string(),
            ));
        }
        for (position, task) in tasks.iter().enumerate() {
            if task.id != position {
                return Err(CoplanError::InvalidJob(format!(
                    "task ids must be sequential from 0: found id {} at position {}",
                    task.id, position
                )));
            }
        }
        let graph = DependencyGraph::from_tasks(&tasks)?;

        Ok(Self {
            tasks,
            completed: BTreeSet::new(),
            in_progress: BTreeSet::new(),
            graph,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id]
    }

    pub fn task_mut(&mut self, id: TaskId) -> &mut Task {
        &mut self.tasks[id]
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn completed(&self) -> &BTreeSet<TaskId> {
        &self.completed
    }

    pub fn in_progress(&self) -> &BTreeSet<TaskId> {
        &self.in_progress
    }

    /// Mark `id` as started at `time`.
    ///
    /// A planned window moves with the actual start and keeps its length.
    pub fn start_task(&mut self, id: TaskId, time: i64) -> Result<()> {
        let task = &mut self.tasks[id];
        task.set_status(TaskStatus::InProgress)?;
        let planned = (task.start, task.finish);
        if let (Some(planned_start), Some(Finish::Planned(planned_end))) = planned {
            task.finish = Some(Finish::Planned(time + (planned_end - planned_start)));
        }
        task.start = Some(time);
        self.in_progress.insert(id);
        Ok(())
    }

    /// Mark `id` as finished with the observed timing.
    pub fn complete_task(&mut self, id: TaskId, timing: Timing) -> Result<()> {
        let task = &mut self.tasks[id];
        task.set_status(TaskStatus::Completed)?;
        task.finish = Some(Finish::Observed(timing));
        self.in_progress.remove(&id);
        self.completed.insert(id);
        Ok(())
    }

    /// Every condition of `id` has at least commenced.
    pub fn conditions_met(&self, id: TaskId) -> bool {
        self.graph
            .dependencies_of(id)
            .iter()
            .all(|dep| self.completed.contains(dep) || self.in_progress.contains(dep))
    }

    /// Promote blocked tasks whose conditions have commenced. Returns the
    /// newly available ids.
    pub fn refresh_availability(&mut self) -> Result<Vec<TaskId>> {
        let ready: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|task| task.status() == TaskStatus::Blocked && self.conditions_met(task.id))
            .map(|task| task.id)
            .collect();

        for &id in &ready {
            self.tasks[id].set_status(TaskStatus::Available)?;
        }
        if !ready.is_empty() {
            debug!(?ready, "tasks became available");
        }
        Ok(ready)
    }

    /// Share of completed tasks, in percent with two decimals.
    pub fn progress(&self) -> f64 {
        let pct = self.completed.len() as f64 / self.tasks.len() as f64 * 100.0;
        (pct * 100.0).round() / 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.completed.len() == self.tasks.len()
    }

    /// Latest finish over all tasks, planned or observed.
    pub fn current_makespan(&self) -> i64 {
        self.tasks
            .iter()
            .filter_map(Task::finish_time)
            .max()
            .unwrap_or(0)
    }
}
