// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical task handle: the task's position in the job.
pub type TaskId = usize;

/// One of the two workers sharing the job.
///
/// - `Human`: probabilistic; may decline a task that is offered to it.
/// - `Robot`: deterministic; always executes what it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentKind {
    Human,
    Robot,
}

impl AgentKind {
    /// Both workers, in the order the control loop serves them.
    pub const ALL: [AgentKind; 2] = [AgentKind::Robot, AgentKind::Human];

    /// The other worker.
    pub fn coworker(self) -> AgentKind {
        match self {
            AgentKind::Human => AgentKind::Robot,
            AgentKind::Robot => AgentKind::Human,
        }
    }

    /// Whether this worker may refuse an offered task.
    pub fn may_decline(self) -> bool {
        match self {
            AgentKind::Human => true,
            AgentKind::Robot => false,
        }
    }

    /// Value of the engine's assignment indicator for this worker.
    pub fn indicator(self) -> bool {
        matches!(self, AgentKind::Human)
    }

    pub fn from_indicator(value: bool) -> AgentKind {
        if value { AgentKind::Human } else { AgentKind::Robot }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Human => "Human",
            AgentKind::Robot => "Robot",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Human" => Ok(AgentKind::Human),
            "Robot" => Ok(AgentKind::Robot),
            other => Err(format!("unknown agent: {other} (expected \"Human\" or \"Robot\")")),
        }
    }
}

/// Which worker a task may be given to.
///
/// Job descriptions spell `Either` as `"Both"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentRequirement {
    Human,
    Robot,
    #[serde(rename = "Both")]
    Either,
}

impl AgentRequirement {
    /// The worker a fixed task belongs to, `None` for universal tasks.
    pub fn fixed_agent(self) -> Option<AgentKind> {
        match self {
            AgentRequirement::Human => Some(AgentKind::Human),
            AgentRequirement::Robot => Some(AgentKind::Robot),
            AgentRequirement::Either => None,
        }
    }

    pub fn is_universal(self) -> bool {
        matches!(self, AgentRequirement::Either)
    }

    /// Whether `agent` may execute a task with this requirement.
    pub fn allows(self, agent: AgentKind) -> bool {
        self.fixed_agent().is_none_or(|fixed| fixed == agent)
    }
}

impl FromStr for AgentRequirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Human" => Ok(AgentRequirement::Human),
            "Robot" => Ok(AgentRequirement::Robot),
            "Both" | "Either" => Ok(AgentRequirement::Either),
            other => Err(format!(
                "unknown agent requirement: {other} (expected \"Human\", \"Robot\" or \"Both\")"
            )),
        }
    }
}

/// Execution status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Some condition has neither started nor completed yet.
    Blocked,
    /// Every condition has at least started.
    Available,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Allowed status moves.
    ///
    /// Forward moves follow `Blocked -> Available -> InProgress -> Completed`.
    /// `InProgress -> Blocked | Available` (and back) is the speculative
    /// demotion used while an agent re-evaluates its queue.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Blocked, Available)
                | (Available, InProgress)
                | (InProgress, Completed)
                | (InProgress, Blocked)
                | (InProgress, Available)
                | (Blocked, InProgress)
        ) || self == next
    }

    /// Started or finished: the fact is observed, not planned.
    pub fn is_settled(self) -> bool {
        matches!(self, TaskStatus::InProgress | TaskStatus::Completed)
    }

    pub fn is_pending(self) -> bool {
        matches!(self, TaskStatus::Blocked | TaskStatus::Available)
    }
}

/// Questions put to a worker through the acceptance oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Question {
    /// "Will you do this task from your own queue now?"
    ExecuteTask,
    /// "Will you take this task over from your coworker?"
    ChangeAgent,
}

impl Question {
    pub fn as_str(self) -> &'static str {
        match self {
            Question::ExecuteTask => "execute_task",
            Question::ChangeAgent => "change_agent",
        }
    }
}
