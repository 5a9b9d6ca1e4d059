// src/sim/durations.rs

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::{debug, trace};

use crate::job::{Action, Job, Task, Timing};
use crate::sim::{DurationOracle, ExecutionStatus, PhaseDurations};
use crate::types::{AgentKind, TaskId, TaskStatus};

// Motion times of each worker. Cube groups index the first dimension of
// `GO_OVER_TARGET`, grid groups the second.
const ROBOT_GRASP: i64 = 3;
const ROBOT_RELEASE: i64 = 3;
const HUMAN_GRASP: i64 = 4;
const HUMAN_RELEASE: i64 = 3;

const GO_OVER_CUBE_ROBOT: [i64; 4] = [3, 4, 3, 4];
const GO_OVER_CUBE_HUMAN: [i64; 4] = [2, 3, 3, 4];

const GO_OVER_TARGET_ROBOT: [[i64; 5]; 4] = [
    [2, 3, 3, 4, 5],
    [2, 2, 2, 3, 4],
    [2, 2, 2, 3, 4],
    [2, 2, 3, 2, 4],
];
const GO_OVER_TARGET_HUMAN: [[i64; 5]; 4] = [
    [3, 2, 3, 2, 4],
    [4, 3, 4, 3, 5],
    [2, 2, 3, 2, 4],
    [1, 2, 2, 3, 4],
];

const GO_HOME_ROBOT: [i64; 5] = [2, 3, 3, 4, 5];
const GO_HOME_HUMAN: [i64; 5] = [3, 2, 3, 2, 4];

/// Spread of the nominal mode; the delayed mode uses three times this.
const HUMAN_SPREAD: f64 = 2.0;
const ROBOT_SPREAD: f64 = 1.0;
const DELAY_FACTOR: f64 = 3.0;

/// Cube group of `object` as seen from `agent`'s side of the table.
fn cube_group(agent: AgentKind, object: &str) -> Option<usize> {
    let (kind, number) = object.split_at_checked(1)?;
    let number: usize = number.parse().ok()?;
    if !(1..=8).contains(&number) {
        return None;
    }
    let low = number <= 4;
    match (agent, kind) {
        (AgentKind::Robot, "r") | (AgentKind::Human, "h") => Some(if low { 0 } else { 1 }),
        (AgentKind::Robot, "a") => Some(if low { 2 } else { 3 }),
        (AgentKind::Human, "a") => Some(if low { 3 } else { 2 }),
        _ => None,
    }
}

/// Grid group of `place` (`A1`..`D5`).
fn grid_group(place: &str) -> Option<usize> {
    let mut chars = place.chars();
    let row = chars.next()?;
    let column = chars.next()?.to_digit(10)?;
    if chars.next().is_some() || !('A'..='D').contains(&row) {
        return None;
    }
    let upper_half = matches!(row, 'A' | 'B');
    match column {
        1 | 2 => Some(if upper_half { 0 } else { 1 }),
        3 | 4 => Some(if upper_half { 2 } else { 3 }),
        5 => Some(4),
        _ => None,
    }
}

/// Table durations of `action` for `agent`, `None` if the worker cannot
/// handle the object or the place is off the grid.
pub fn nominal_phases(agent: AgentKind, action: &Action) -> Option<PhaseDurations> {
    let cube = cube_group(agent, &action.object)?;
    let place = grid_group(&action.place)?;

    let phases = match agent {
        AgentKind::Robot => PhaseDurations {
            preparation: GO_OVER_CUBE_ROBOT[cube] + ROBOT_GRASP,
            execution: GO_OVER_TARGET_ROBOT[cube][place] + ROBOT_RELEASE,
            completion: GO_HOME_ROBOT[place],
        },
        AgentKind::Human => PhaseDurations {
            preparation: GO_OVER_CUBE_HUMAN[cube] + HUMAN_GRASP,
            execution: GO_OVER_TARGET_HUMAN[cube][place] + HUMAN_RELEASE,
            completion: GO_HOME_HUMAN[place],
        },
    };
    Some(phases)
}

#[derive(Debug, Clone, Copy)]
struct Execution {
    task: TaskId,
    start: i64,
    phases: PhaseDurations,
    /// Phase total plus any wait for the coworker's prerequisite.
    length: i64,
}

/// Seeded simulation of both workers executing tasks.
///
/// Each task gets one draw per seed: with probability `fail_probability` it
/// runs in the delayed mode (three times the mean and spread), otherwise in
/// the nominal mode. Phases are at least one time unit.
#[derive(Debug, Clone)]
pub struct SimulatedWorkers {
    seed: u64,
    fail_probability: f64,
    human: Option<Execution>,
    robot: Option<Execution>,
}

impl SimulatedWorkers {
    pub fn new(seed: u64, fail_probability: f64) -> Self {
        Self {
            seed,
            fail_probability,
            human: None,
            robot: None,
        }
    }

    fn slot(&self, agent: AgentKind) -> &Option<Execution> {
        match agent {
            AgentKind::Human => &self.human,
            AgentKind::Robot => &self.robot,
        }
    }

    fn slot_mut(&mut self, agent: AgentKind) -> &mut Option<Execution> {
        match agent {
            AgentKind::Human => &mut self.human,
            AgentKind::Robot => &mut self.robot,
        }
    }

    fn sample(&self, task: &Task, agent: AgentKind) -> PhaseDurations {
        let Some(nominal) = nominal_phases(agent, &task.action) else {
            return PhaseDurations::default();
        };

        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(task.id as u64));
        let delayed = rng.gen_bool(self.fail_probability);
        let spread = match agent {
            AgentKind::Human => HUMAN_SPREAD,
            AgentKind::Robot => ROBOT_SPREAD,
        };
        let (factor, spread) = if delayed {
            (DELAY_FACTOR, spread * DELAY_FACTOR)
        } else {
            (1.0, spread)
        };

        let mut draw = |mean: i64| -> i64 {
            let center = mean as f64 * factor;
            let value = Normal::new(center, spread)
                .map_or(center, |normal| normal.sample(&mut rng));
            (value as i64).max(1)
        };
        let phases = PhaseDurations {
            preparation: draw(nominal.preparation),
            execution: draw(nominal.execution),
            completion: draw(nominal.completion),
        };
        trace!(task = task.id, %agent, delayed, ?phases, "sampled durations");
        phases
    }

    /// Wait caused by a prerequisite the coworker is still placing.
    fn handoff_wait(&self, job: &Job, task: TaskId, agent: AgentKind, now: i64, own_preparation: i64) -> i64 {
        let Some(other) = self.slot(agent.coworker()) else {
            return 0;
        };
        let prerequisite_running = job.task(task).conditions.iter().any(|dep| {
            *dep == other.task && job.task(*dep).status() == TaskStatus::InProgress
        });
        if !prerequisite_running {
            return 0;
        }
        let released_at = other.start + other.phases.preparation + other.phases.execution;
        (released_at - now - own_preparation).max(0)
    }
}

impl DurationOracle for SimulatedWorkers {
    fn estimate(&self, task: &Task, agent: AgentKind) -> PhaseDurations {
        self.sample(task, agent)
    }

    fn begin(&mut self, job: &Job, task: TaskId, agent: AgentKind, now: i64) {
        let phases = self.sample(job.task(task), agent);
        let wait = self.handoff_wait(job, task, agent, now, phases.preparation);
        let length = phases.total() + wait;
        debug!(task, %agent, now, length, wait, "execution started");
        *self.slot_mut(agent) = Some(Execution {
            task,
            start: now,
            phases,
            length,
        });
    }

    fn query(&mut self, job: &Job, agent: AgentKind, now: i64) -> ExecutionStatus {
        let Some(exec) = *self.slot(agent) else {
            return ExecutionStatus::Idle;
        };

        let prepared_at = exec.start + exec.phases.preparation;
        let released_at = exec.start + exec.length - exec.phases.completion;
        let finished_at = exec.start + exec.length;

        if now < prepared_at {
            return ExecutionStatus::Preparation;
        }
        if now < released_at {
            let coworker_holds_prerequisite = self.slot(agent.coworker()).is_some_and(|other| {
                job.task(exec.task).conditions.contains(&other.task)
                    && now < other.start + other.length - other.phases.completion
            });
            if coworker_holds_prerequisite {
                return ExecutionStatus::Waiting(now - prepared_at);
            }
            return ExecutionStatus::Execution;
        }
        if now < finished_at {
            return ExecutionStatus::Completion;
        }

        *self.slot_mut(agent) = None;
        ExecutionStatus::Completed(Timing {
            total: finished_at,
            preparation: exec.phases.preparation,
            execution: exec.phases.execution,
            completion: exec.phases.completion,
        })
    }
}
