// src/sim/acceptance.rs

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::job::Task;
use crate::sim::AcceptanceOracle;
use crate::types::{AgentKind, Question, TaskId};

pub const DEFAULT_REJECTION_PROBABILITY: f64 = 0.2;

/// Per-task rejection probabilities of the 16-task cases.
pub fn default_rejection_table() -> BTreeMap<TaskId, f64> {
    [
        0.1, 0.2, 0.1, 0.8, 0.2, 0.2, 0.2, 0.1, 0.2, 0.8, 0.2, 0.2, 0.1, 0.2, 0.1, 0.2,
    ]
    .into_iter()
    .enumerate()
    .collect()
}

/// Seeded answers: the robot always accepts, the human accepts with
/// probability `1 - reject_probability(task)`.
///
/// The answer depends only on the seed, the task id and the question, so the
/// same question about the same task always gets the same answer.
#[derive(Debug, Clone)]
pub struct SimulatedAcceptance {
    seed: u64,
    probabilities: BTreeMap<TaskId, f64>,
    default_probability: f64,
}

impl SimulatedAcceptance {
    pub fn new(seed: u64, probabilities: BTreeMap<TaskId, f64>, default_probability: f64) -> Self {
        Self {
            seed,
            probabilities,
            default_probability,
        }
    }

    fn rng_for(&self, question: Question, task: TaskId) -> StdRng {
        let salt = match question {
            Question::ExecuteTask => 0,
            Question::ChangeAgent => 1,
        };
        StdRng::seed_from_u64(
            self.seed
                .wrapping_add(task as u64)
                .wrapping_mul(2)
                .wrapping_add(salt),
        )
    }
}

impl AcceptanceOracle for SimulatedAcceptance {
    fn reject_probability(&self, task: &Task) -> f64 {
        self.probabilities
            .get(&task.id)
            .copied()
            .unwrap_or(self.default_probability)
    }

    fn ask(&mut self, question: Question, task: &Task, agent: AgentKind) -> bool {
        if !agent.may_decline() {
            return true;
        }
        let p_reject = self.reject_probability(task).clamp(0.0, 1.0);
        let accepted = !self.rng_for(question, task.id).gen_bool(p_reject);
        info!(
            task = task.id,
            %agent,
            question = question.as_str(),
            accepted,
            "asked worker"
        );
        accepted
    }
}
