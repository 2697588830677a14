// src/engine/mod.rs

//! Build orchestration engine.
//!
//! This module ties together:
//! - the task scheduler
//! - the main runtime event loop that reacts to:
//!   - task triggers (the initial `clean` of a build)
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::errors::TaskError;
use crate::task::TaskReport;

pub use crate::types::TaskName;

/// Outcome of one task run, as reported back by the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Success(TaskReport),
    Failed(TaskError),
}

impl From<Result<TaskReport, TaskError>> for TaskOutcome {
    fn from(result: Result<TaskReport, TaskError>) -> Self {
        match result {
            Ok(report) => TaskOutcome::Success(report),
            Err(err) => TaskOutcome::Failed(err),
        }
    }
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once the scheduler is idle again.
    pub exit_when_idle: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            exit_when_idle: true,
        }
    }
}

/// Events flowing into the runtime from the build entry point and executors.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Start `task` and everything downstream of it.
    TaskTriggered { task: TaskName },
    /// A task run finished with a concrete outcome.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
