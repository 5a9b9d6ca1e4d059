// src/planner/registry.rs

use std::collections::BTreeMap;

use crate::planner::model::ConstraintId;
use crate::types::TaskId;

/// Which border constraint of an ordered task pair `(i, j)` a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BorderSlot {
    /// Same agent, independent: `start(j) >= end(i)`.
    After,
    /// Same agent, independent: `end(j) <= start(i)`.
    Before,
    /// Same agent, `i` is a condition of `j`: `start(j) >= end(i)`.
    Sequential,
    /// Different agents, `i` done by the human: `end(j) >= end(i) + k`.
    HandoffFromHuman,
    /// Different agents, `i` done by the robot: `end(j) >= end(i) + k`.
    HandoffFromRobot,
}

impl BorderSlot {
    const FIRST: BorderSlot = BorderSlot::After;
}

/// Handles of the border constraints, keyed by `(pair index, slot)` where
/// the pair index of `(i, j)` is `i * n + j`.
///
/// Taking handles out of the registry invalidates them: a second retirement
/// of the same task finds nothing to remove.
#[derive(Debug, Clone)]
pub struct ConstraintRegistry {
    task_count: usize,
    entries: BTreeMap<(usize, BorderSlot), ConstraintId>,
}

impl ConstraintRegistry {
    pub fn new(task_count: usize) -> Self {
        Self {
            task_count,
            entries: BTreeMap::new(),
        }
    }

    pub fn pair_index(&self, i: TaskId, j: TaskId) -> usize {
        i * self.task_count + j
    }

    pub fn insert(&mut self, i: TaskId, j: TaskId, slot: BorderSlot, id: ConstraintId) {
        let key = (self.pair_index(i, j), slot);
        self.entries.insert(key, id);
    }

    pub fn get(&self, i: TaskId, j: TaskId, slot: BorderSlot) -> Option<ConstraintId> {
        self.entries.get(&(self.pair_index(i, j), slot)).copied()
    }

    /// Take every handle registered under `(i, *)`.
    pub fn take_from(&mut self, i: TaskId) -> Vec<ConstraintId> {
        let lo = (self.pair_index(i, 0), BorderSlot::FIRST);
        let hi = (self.pair_index(i + 1, 0), BorderSlot::FIRST);
        let keys: Vec<_> = self.entries.range(lo..hi).map(|(key, _)| *key).collect();
        keys.into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
