// src/job/input.rs

//! JSON job descriptions.
//!
//! ```json
//! [
//!   { "ID": 0, "Object": "r1", "Place": "A1", "Agent": "Robot", "Conditions": [] },
//!   { "ID": 1, "Object": "a3", "Place": "A2", "Agent": "Both",  "Conditions": [0] }
//! ]
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::{CoplanError, Result};
use crate::job::task::{Action, Task};
use crate::types::{AgentRequirement, TaskId};

/// One record of a job description, as written on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRecord {
    #[serde(rename = "ID")]
    pub id: TaskId,
    #[serde(rename = "Object")]
    pub object: String,
    #[serde(rename = "Place")]
    pub place: String,
    #[serde(rename = "Agent")]
    pub agent: String,
    #[serde(rename = "Conditions", default)]
    pub conditions: Vec<TaskId>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = CoplanError;

    fn try_from(record: TaskRecord) -> std::result::Result<Self, Self::Error> {
        let requirement: AgentRequirement = record
            .agent
            .parse()
            .map_err(|e| CoplanError::InvalidJob(format!("task {}: {e}", record.id)))?;
        Ok(Task::new(
            record.id,
            Action {
                object: record.object,
                place: record.place,
            },
            record.conditions,
            requirement,
        ))
    }
}

/// Parse a job description from JSON text.
pub fn parse_job(contents: &str) -> Result<Vec<Task>> {
    let records: Vec<TaskRecord> = serde_json::from_str(contents)?;
    records.into_iter().map(Task::try_from).collect()
}

/// Read and parse a job description file.
pub fn load_job(path: impl AsRef<Path>) -> Result<Vec<Task>> {
    let contents = fs::read_to_string(path)?;
    parse_job(&contents)
}
