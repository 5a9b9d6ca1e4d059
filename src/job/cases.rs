// src/job/cases.rs

//! Built-in cases: 16 cube placements over a 4x4 grid.
//!
//! | case | cubes                        | conditions                   |
//! |------|------------------------------|------------------------------|
//! | 1    | human + robot                | none                         |
//! | 2    | human + robot                | one predecessor per column   |
//! | 3    | human + robot                | two/three-predecessor lattice|
//! | 4    | configured allocation weights| none                         |
//! | 5    | configured allocation weights| one predecessor per column   |
//! | 6    | configured allocation weights| two/three-predecessor lattice|

use std::str::FromStr;

use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use tracing::debug;

use crate::errors::{CoplanError, Result};
use crate::job::task::{Action, Task};
use crate::types::{AgentRequirement, TaskId};

pub const CASE_LENGTH: usize = 16;
const CUBES_PER_SET: usize = 8;
const ROWS: [char; 4] = ['A', 'B', 'C', 'D'];
const COLUMNS: [char; 4] = ['1', '2', '3', '4'];

/// One of the six built-in cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Case(u8);

impl Case {
    pub fn number(self) -> u8 {
        self.0
    }

    /// Cases 4..=6 may draw allocable cubes.
    pub fn uses_allocation_weights(self) -> bool {
        self.0 >= 4
    }

    fn conditions(self, id: TaskId) -> Vec<TaskId> {
        match self.0 {
            2 | 5 if id >= 4 => vec![id - 4],
            3 | 6 => lattice_conditions(id),
            _ => Vec::new(),
        }
    }
}

impl FromStr for Case {
    type Err = CoplanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().parse::<u8>() {
            Ok(n @ 1..=6) => Ok(Case(n)),
            _ => Err(CoplanError::InvalidCase(s.to_string())),
        }
    }
}

/// Tasks after the first row wait for their neighbours in the previous row.
fn lattice_conditions(id: TaskId) -> Vec<TaskId> {
    if id < 4 {
        return Vec::new();
    }
    let base = id - 4;
    match id % 4 {
        0 => vec![base + 1, base],
        1 | 2 => vec![base + 1, base, base - 1],
        _ => vec![base, base - 1],
    }
}

/// Cube weights for `(human, robot, allocable)` sets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationWeights {
    pub human: f64,
    pub robot: f64,
    pub allocable: f64,
}

impl AllocationWeights {
    pub const HUMAN_ROBOT: AllocationWeights = AllocationWeights {
        human: 0.5,
        robot: 0.5,
        allocable: 0.0,
    };
}

impl Default for AllocationWeights {
    fn default() -> Self {
        Self {
            human: 0.3,
            robot: 0.3,
            allocable: 0.4,
        }
    }
}

/// Generate the tasks of `case`.
pub fn generate(case: Case, seed: u64, weights: AllocationWeights) -> Result<Vec<Task>> {
    let weights = if case.uses_allocation_weights() {
        weights
    } else {
        AllocationWeights::HUMAN_ROBOT
    };
    let objects = draw_objects(seed, weights)?;

    let mut tasks = Vec::with_capacity(CASE_LENGTH);
    for (id, object) in objects.into_iter().enumerate() {
        let place = format!("{}{}", ROWS[id / 4], COLUMNS[id % 4]);
        let requirement = requirement_for(&object);
        tasks.push(Task::new(
            id,
            Action { object, place },
            case.conditions(id),
            requirement,
        ));
    }

    debug!(case = case.number(), seed, "generated case");
    Ok(tasks)
}

fn requirement_for(object: &str) -> AgentRequirement {
    match object.chars().next() {
        Some('h') => AgentRequirement::Human,
        Some('r') => AgentRequirement::Robot,
        _ => AgentRequirement::Either,
    }
}

/// Draw `CASE_LENGTH` distinct cubes, each set weighted by its share.
fn draw_objects(seed: u64, weights: AllocationWeights) -> Result<Vec<String>> {
    let mut pool: Vec<(String, f64)> = Vec::new();
    for (prefix, weight) in [
        ('h', weights.human),
        ('r', weights.robot),
        ('a', weights.allocable),
    ] {
        if weight > 0.0 {
            for n in 1..=CUBES_PER_SET {
                pool.push((format!("{prefix}{n}"), weight / CUBES_PER_SET as f64));
            }
        }
    }
    if pool.len() < CASE_LENGTH {
        return Err(CoplanError::ConfigError(format!(
            "allocation weights leave {} cubes, need {}",
            pool.len(),
            CASE_LENGTH
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut drawn = Vec::with_capacity(CASE_LENGTH);
    while drawn.len() < CASE_LENGTH {
        let dist = WeightedIndex::new(pool.iter().map(|(_, w)| *w))
            .map_err(|e| CoplanError::ConfigError(format!("invalid allocation weights: {e}")))?;
        let (object, _) = pool.swap_remove(dist.sample(&mut rng));
        drawn.push(object);
    }
    Ok(drawn)
}
