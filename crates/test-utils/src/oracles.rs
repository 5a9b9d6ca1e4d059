use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use coplan::job::{Job, Task, Timing};
use coplan::sim::{AcceptanceOracle, DurationOracle, ExecutionStatus, PhaseDurations};
use coplan::types::{AgentKind, Question, TaskId};

#[derive(Debug, Clone, Copy)]
struct Running {
    task: TaskId,
    start: i64,
    length: i64,
    phases: PhaseDurations,
    overrun: i64,
}

/// Durations fixed per `(task, agent)`.
///
/// Tasks run exactly as estimated unless an overrun is scripted for them.
/// There are no handoff waits.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDurations {
    phases: BTreeMap<(TaskId, AgentKind), PhaseDurations>,
    overrun: BTreeMap<TaskId, i64>,
    running: BTreeMap<AgentKind, Running>,
}

impl ScriptedDurations {
    pub fn new() -> Self {
        Self::default()
    }

    /// `total` time units, all of them in the execution phase.
    pub fn with(self, task: TaskId, agent: AgentKind, total: i64) -> Self {
        self.with_phases(
            task,
            agent,
            PhaseDurations {
                preparation: 0,
                execution: total,
                completion: 0,
            },
        )
    }

    /// Same duration for both agents.
    pub fn with_both(self, task: TaskId, total: i64) -> Self {
        self.with(task, AgentKind::Human, total)
            .with(task, AgentKind::Robot, total)
    }

    pub fn with_phases(mut self, task: TaskId, agent: AgentKind, phases: PhaseDurations) -> Self {
        self.phases.insert((task, agent), phases);
        self
    }

    /// The task takes `extra` units longer than estimated.
    pub fn with_overrun(mut self, task: TaskId, extra: i64) -> Self {
        self.overrun.insert(task, extra);
        self
    }
}

impl DurationOracle for ScriptedDurations {
    fn estimate(&self, task: &Task, agent: AgentKind) -> PhaseDurations {
        self.phases
            .get(&(task.id, agent))
            .copied()
            .unwrap_or_default()
    }

    fn begin(&mut self, _job: &Job, task: TaskId, agent: AgentKind, now: i64) {
        let phases = self.phases.get(&(task, agent)).copied().unwrap_or_default();
        let overrun = self.overrun.get(&task).copied().unwrap_or(0);
        self.running.insert(
            agent,
            Running {
                task,
                start: now,
                length: phases.total() + overrun,
                phases,
                overrun,
            },
        );
    }

    fn query(&mut self, _job: &Job, agent: AgentKind, now: i64) -> ExecutionStatus {
        let Some(run) = self.running.get(&agent).copied() else {
            return ExecutionStatus::Idle;
        };
        if now < run.start + run.length {
            return ExecutionStatus::Execution;
        }
        self.running.remove(&agent);
        ExecutionStatus::Completed(Timing {
            total: run.start + run.length,
            preparation: run.phases.preparation,
            execution: run.phases.execution + run.overrun,
            completion: run.phases.completion,
        })
    }
}

/// One question put to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asked {
    pub question: Question,
    pub task: TaskId,
    pub agent: AgentKind,
    pub accepted: bool,
}

/// Shared record of every question asked.
#[derive(Debug, Clone, Default)]
pub struct AskLog(Arc<Mutex<Vec<Asked>>>);

impl AskLog {
    pub fn entries(&self) -> Vec<Asked> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, question: Question, task: TaskId) -> usize {
        self.entries()
            .iter()
            .filter(|a| a.question == question && a.task == task)
            .count()
    }

    fn push(&self, asked: Asked) {
        self.0.lock().unwrap().push(asked);
    }
}

/// Acceptance oracle answering from a script: everything is accepted except
/// the scripted `(question, task)` declines.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAcceptance {
    probabilities: BTreeMap<TaskId, f64>,
    declines: HashSet<(Question, TaskId)>,
    decline_everything: bool,
    log: AskLog,
}

impl ScriptedAcceptance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejection probability fed to the planner for `task`.
    pub fn with_probability(mut self, task: TaskId, p: f64) -> Self {
        self.probabilities.insert(task, p);
        self
    }

    pub fn declining(mut self, question: Question, task: TaskId) -> Self {
        self.declines.insert((question, task));
        self
    }

    /// Every question that may be declined is declined.
    pub fn declining_everything(mut self) -> Self {
        self.decline_everything = true;
        self
    }

    pub fn log(&self) -> AskLog {
        self.log.clone()
    }
}

impl AcceptanceOracle for ScriptedAcceptance {
    fn reject_probability(&self, task: &Task) -> f64 {
        self.probabilities.get(&task.id).copied().unwrap_or(0.0)
    }

    fn ask(&mut self, question: Question, task: &Task, agent: AgentKind) -> bool {
        let declined = agent.may_decline()
            && (self.decline_everything || self.declines.contains(&(question, task.id)));
        self.log.push(Asked {
            question,
            task: task.id,
            agent,
            accepted: !declined,
        });
        !declined
    }
}
