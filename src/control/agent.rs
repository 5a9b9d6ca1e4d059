// src/control/agent.rs

use tracing::{debug, info};

use crate::errors::Result;
use crate::job::{Job, Timing};
use crate::sim::AcceptanceOracle;
use crate::types::{AgentKind, Question, TaskId, TaskStatus};

/// Outcome of [`Agent::find_next_task`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Task the agent will start now.
    pub task: Option<TaskId>,
    /// Tasks the agent declined while scanning; they go to the coworker.
    pub declined: Vec<TaskId>,
}

/// One worker: its queue of task ids, the task it is executing, and the
/// tasks it has declined.
///
/// `Idle` when there is no current task, `Busy` otherwise.
#[derive(Debug, Clone)]
pub struct Agent {
    kind: AgentKind,
    queue: Vec<TaskId>,
    current: Option<TaskId>,
    rejected: Vec<TaskId>,
    waiting: i64,
}

impl Agent {
    pub fn new(kind: AgentKind) -> Self {
        Self {
            kind,
            queue: Vec::new(),
            current: None,
            rejected: Vec::new(),
            waiting: 0,
        }
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn queue(&self) -> &[TaskId] {
        &self.queue
    }

    pub fn current(&self) -> Option<TaskId> {
        self.current
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub fn rejected(&self) -> &[TaskId] {
        &self.rejected
    }

    /// Time spent waiting on the coworker during the current task.
    pub fn waiting(&self) -> i64 {
        self.waiting
    }

    /// Replace the queue with a freshly planned one.
    pub fn refresh_tasks(&mut self, queue: &[TaskId]) {
        self.queue = queue.to_vec();
    }

    /// Idle -> Busy with `task` started at `time`.
    pub fn begin_task(&mut self, job: &mut Job, task: TaskId, time: i64) -> Result<()> {
        job.start_task(task, time)?;
        self.current = Some(task);
        let action = &job.task(task).action;
        info!(
            time,
            agent = %self.kind,
            task,
            object = %action.object,
            place = %action.place,
            "task started"
        );
        Ok(())
    }

    /// Busy -> Idle. Returns the finished task.
    pub fn complete_task(&mut self, job: &mut Job, timing: Timing) -> Result<Option<TaskId>> {
        let Some(task) = self.current else {
            return Ok(None);
        };
        job.complete_task(task, timing)?;
        self.current = None;
        self.waiting = 0;
        Ok(Some(task))
    }

    pub fn record_waiting(&mut self, waited: i64) {
        self.waiting = waited;
    }

    /// Remember a declined task. Returns `false` if it was already known.
    pub fn record_rejection(&mut self, task: TaskId) -> bool {
        if self.rejected.contains(&task) {
            return false;
        }
        self.rejected.push(task);
        true
    }

    /// Queued tasks that are `Available`, in queue order.
    pub fn available_tasks(&self, job: &Job) -> Vec<TaskId> {
        self.queue
            .iter()
            .copied()
            .filter(|id| job.task(*id).status() == TaskStatus::Available)
            .collect()
    }

    /// Available tasks either worker could take.
    pub fn available_universal_tasks(&self, job: &Job) -> Vec<TaskId> {
        self.available_tasks(job)
            .into_iter()
            .filter(|id| job.task(*id).is_universal())
            .collect()
    }

    /// Pick the next task from the queue.
    ///
    /// A busy agent's current task is demoted to `Blocked` while the queue is
    /// scanned and restored if nothing else is picked. Universal tasks offered
    /// to an agent that may decline go through the acceptance oracle.
    pub fn find_next_task<A>(&mut self, job: &mut Job, acceptance: &mut A) -> Result<Selection>
    where
        A: AcceptanceOracle + ?Sized,
    {
        let demoted = self.current;
        if let Some(task) = demoted {
            job.task_mut(task).set_status(TaskStatus::Blocked)?;
        }

        let mut selection = Selection::default();
        for id in self.available_tasks(job) {
            let task = job.task(id);
            if task.is_universal() && self.kind.may_decline() {
                if !acceptance.ask(Question::ExecuteTask, task, self.kind) {
                    info!(agent = %self.kind, task = id, "task declined");
                    self.record_rejection(id);
                    selection.declined.push(id);
                    continue;
                }
                debug!(agent = %self.kind, task = id, "task accepted");
            }
            selection.task = Some(id);
            break;
        }

        if let Some(task) = demoted {
            if selection.task.is_none() {
                job.task_mut(task).set_status(TaskStatus::InProgress)?;
            }
        }
        Ok(selection)
    }
}
