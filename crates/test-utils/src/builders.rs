#![allow(dead_code)]

use coplan::config::{ConfigFile, RawConfigFile};
use coplan::job::{Action, Job, Task};
use coplan::types::{AgentRequirement, TaskId};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.simulation.seed = seed;
        self
    }

    pub fn fail_probability(mut self, p: f64) -> Self {
        self.config.simulation.fail_probability = p;
        self
    }

    pub fn allocation_weights(mut self, weights: [f64; 3]) -> Self {
        self.config.simulation.allocation_weights = weights;
        self
    }

    pub fn rejection_probability(mut self, task: TaskId, p: f64) -> Self {
        self.config
            .simulation
            .rejection_probabilities
            .insert(task.to_string(), p);
        self
    }

    pub fn max_nodes(mut self, nodes: u64) -> Self {
        self.config.solver.max_nodes = nodes;
        self
    }

    pub fn max_time_ms(mut self, ms: u64) -> Self {
        self.config.solver.max_time_ms = ms;
        self.config.solver.what_if_max_time_ms = ms;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a single `Task`.
pub struct TaskBuilder {
    id: TaskId,
    object: String,
    place: String,
    requirement: AgentRequirement,
    conditions: Vec<TaskId>,
}

impl TaskBuilder {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            object: format!("a{}", id % 8 + 1),
            place: "A1".to_string(),
            requirement: AgentRequirement::Either,
            conditions: Vec::new(),
        }
    }

    pub fn requirement(mut self, requirement: AgentRequirement) -> Self {
        self.requirement = requirement;
        self
    }

    pub fn object(mut self, object: &str) -> Self {
        self.object = object.to_string();
        self
    }

    pub fn place(mut self, place: &str) -> Self {
        self.place = place.to_string();
        self
    }

    pub fn after(mut self, dep: TaskId) -> Self {
        self.conditions.push(dep);
        self
    }

    pub fn build(self) -> Task {
        Task::new(
            self.id,
            Action {
                object: self.object,
                place: self.place,
            },
            self.conditions,
            self.requirement,
        )
    }
}

/// Builder for a `Job`; each call appends the next task id.
pub struct JobBuilder {
    tasks: Vec<Task>,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    fn push(mut self, requirement: AgentRequirement, after: &[TaskId]) -> Self {
        let mut task = TaskBuilder::new(self.tasks.len()).requirement(requirement);
        for dep in after {
            task = task.after(*dep);
        }
        self.tasks.push(task.build());
        self
    }

    pub fn robot(self, after: &[TaskId]) -> Self {
        self.push(AgentRequirement::Robot, after)
    }

    pub fn human(self, after: &[TaskId]) -> Self {
        self.push(AgentRequirement::Human, after)
    }

    pub fn either(self, after: &[TaskId]) -> Self {
        self.push(AgentRequirement::Either, after)
    }

    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn tasks(self) -> Vec<Task> {
        self.tasks
    }

    pub fn build(self) -> Job {
        Job::new(self.tasks).expect("Failed to build valid job from builder")
    }
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self::new()
    }
}
