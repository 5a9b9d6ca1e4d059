// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::planner::SolveStatus;
use crate::types::{TaskId, TaskStatus};

#[derive(Error, Debug)]
pub enum CoplanError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown case '{0}' (expected one of 1, 2, 3, 4, 5, 6)")]
    InvalidCase(String),

    #[error("Invalid job description: {0}")]
    InvalidJob(String),

    #[error(
        "No feasible schedule ({status:?}) within budget: horizon {horizon}, {variables} variables, {constraints} constraints"
    )]
    NoFeasibleSchedule {
        status: SolveStatus,
        horizon: i64,
        variables: usize,
        constraints: usize,
    },

    #[error("Task {task} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        task: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Run interrupted before the job completed")]
    Interrupted,

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CoplanError>;
