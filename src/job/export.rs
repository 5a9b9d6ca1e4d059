// src/job/export.rs

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::job::Job;
use crate::types::{AgentKind, TaskId, TaskStatus};

const ASSIGNED_PREFIX: &str = "Assigned to ";

/// Schedule snapshot as a record of parallel arrays, one entry per task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleExport {
    #[serde(rename = "Status")]
    pub status: Vec<TaskStatus>,
    #[serde(rename = "Start")]
    pub start: Vec<Option<i64>>,
    #[serde(rename = "End")]
    pub end: Vec<Option<i64>>,
    /// `"Human"`/`"Robot"` for fixed tasks, `"Assigned to X"` for universal ones.
    #[serde(rename = "Agent")]
    pub agent: Vec<String>,
    #[serde(rename = "ID")]
    pub id: Vec<TaskId>,
    #[serde(rename = "Conditions")]
    pub conditions: Vec<Vec<TaskId>>,
    #[serde(rename = "Object")]
    pub object: Vec<String>,
    #[serde(rename = "Place")]
    pub place: Vec<String>,
}

/// One task of a re-imported export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRow {
    pub id: TaskId,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub agent: Option<AgentKind>,
    pub status: TaskStatus,
}

impl ScheduleExport {
    pub fn from_job(job: &Job) -> Self {
        let tasks = job.tasks();
        Self {
            status: tasks.iter().map(|t| t.status()).collect(),
            start: tasks.iter().map(|t| t.start).collect(),
            end: tasks.iter().map(|t| t.finish_time()).collect(),
            agent: tasks
                .iter()
                .map(|t| match (t.assigned, t.is_universal()) {
                    (Some(agent), true) => format!("{ASSIGNED_PREFIX}{agent}"),
                    (Some(agent), false) => agent.to_string(),
                    (None, _) => "Both".to_string(),
                })
                .collect(),
            id: tasks.iter().map(|t| t.id).collect(),
            conditions: tasks.iter().map(|t| t.conditions.clone()).collect(),
            object: tasks.iter().map(|t| t.action.object.clone()).collect(),
            place: tasks.iter().map(|t| t.action.place.clone()).collect(),
        }
    }

    /// Read the export back as per-task rows.
    pub fn rows(&self) -> Vec<ExportRow> {
        (0..self.id.len())
            .map(|i| ExportRow {
                id: self.id[i],
                start: self.start[i],
                end: self.end[i],
                agent: self.agent[i]
                    .trim_start_matches(ASSIGNED_PREFIX)
                    .parse()
                    .ok(),
                status: self.status[i],
            })
            .collect()
    }
}

/// Initial and final schedule of a run, serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunArtifact(pub ScheduleExport, pub ScheduleExport);

impl RunArtifact {
    pub fn initial(&self) -> &ScheduleExport {
        &self.0
    }

    pub fn last(&self) -> &ScheduleExport {
        &self.1
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
