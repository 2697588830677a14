// src/errors.rs

//! Crate-wide error types.
//!
//! - [`PipelineError`] covers configuration, graph construction and the
//!   overall build result.
//! - [`TaskError`] is the failure of a single task run; it is what the build
//!   report surfaces verbatim.
//! - [`TransformError`] is returned by individual transforms and wrapped into
//!   a [`TaskError`] by the runner.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::TaskName;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("build failed: {0} task(s) did not succeed")]
    BuildFailed(usize),

    #[error("build interrupted after {0} task(s) finished")]
    Interrupted(usize),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of one task run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("clean failed for {path:?}: {message}")]
    Clean { path: PathBuf, message: String },

    #[error("task '{task}': no files matched {patterns:?}")]
    NoMatch { task: TaskName, patterns: Vec<String> },

    #[error("task '{task}': {tool} failed on {path:?}: {message}")]
    Transform {
        task: TaskName,
        tool: String,
        path: PathBuf,
        message: String,
    },

    #[error("task '{task}': writing {path:?} failed: {message}")]
    Write {
        task: TaskName,
        path: PathBuf,
        message: String,
    },

    #[error("task '{task}' timed out after {limit:?}")]
    Timeout { task: TaskName, limit: Duration },

    #[error("task '{task}' is misconfigured: {message}")]
    Invalid { task: TaskName, message: String },
}

impl TaskError {
    /// Attach a task name to a transform error.
    pub fn from_transform(task: &str, err: TransformError) -> Self {
        match err {
            TransformError::Failed {
                tool,
                path,
                message,
            } => TaskError::Transform {
                task: task.to_string(),
                tool,
                path,
                message,
            },
            TransformError::Invalid { kind, message } => TaskError::Invalid {
                task: task.to_string(),
                message: format!("{kind}: {message}"),
            },
            TransformError::UnknownKind(kind) => TaskError::Invalid {
                task: task.to_string(),
                message: format!("unknown transform kind '{kind}'"),
            },
        }
    }
}

/// Error produced by a single transform stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Compile-style failure on a concrete input file.
    #[error("{tool} failed on {path:?}: {message}")]
    Failed {
        tool: String,
        path: PathBuf,
        message: String,
    },

    /// The transform descriptor carries bad or missing options.
    #[error("invalid '{kind}' transform: {message}")]
    Invalid { kind: String, message: String },

    #[error("unknown transform kind '{0}'")]
    UnknownKind(String),
}

impl TransformError {
    pub fn failed(tool: &str, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        TransformError::Failed {
            tool: tool.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid(kind: &str, message: impl Into<String>) -> Self {
        TransformError::Invalid {
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
