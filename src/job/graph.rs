// src/job/graph.rs

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{CoplanError, Result};
use crate::job::task::Task;
use crate::types::TaskId;

/// Dependency graph of a job.
///
/// Edge direction: condition -> task. For a task 5 with `conditions = [1]`
/// we add edge 1 -> 5.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraphMap<TaskId, ()>,
}

impl DependencyGraph {
    /// Build the graph, checking that conditions only reference earlier tasks.
    pub fn from_tasks(tasks: &[Task]) -> Result<Self> {
        let mut graph: DiGraphMap<TaskId, ()> = DiGraphMap::new();
        for task in tasks {
            graph.add_node(task.id);
        }

        for task in tasks {
            for &dep in &task.conditions {
                if dep >= tasks.len() {
                    return Err(CoplanError::InvalidJob(format!(
                        "task {} has unknown condition {}",
                        task.id, dep
                    )));
                }
                if dep >= task.id {
                    return Err(CoplanError::InvalidJob(format!(
                        "task {} has condition {} that does not appear earlier in the job",
                        task.id, dep
                    )));
                }
                graph.add_edge(dep, task.id, ());
            }
        }

        // Unreachable while conditions must be earlier tasks.
        if let Err(cycle) = toposort(&graph, None) {
            return Err(CoplanError::InvalidJob(format!(
                "dependency cycle involving task {}",
                cycle.node_id()
            )));
        }

        Ok(Self { graph })
    }

    /// Direct conditions of `task`, ascending.
    pub fn dependencies_of(&self, task: TaskId) -> Vec<TaskId> {
        let mut deps: Vec<TaskId> = self
            .graph
            .neighbors_directed(task, Direction::Incoming)
            .collect();
        deps.sort_unstable();
        deps
    }

    /// Tasks listing `task` as a condition, ascending.
    pub fn dependents_of(&self, task: TaskId) -> Vec<TaskId> {
        let mut dependents: Vec<TaskId> = self
            .graph
            .neighbors_directed(task, Direction::Outgoing)
            .collect();
        dependents.sort_unstable();
        dependents
    }

    /// `true` when `prerequisite` is a direct condition of `task`.
    pub fn depends_on(&self, task: TaskId, prerequisite: TaskId) -> bool {
        self.graph.contains_edge(prerequisite, task)
    }
}
