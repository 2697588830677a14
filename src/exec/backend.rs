// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The runtime talks to a `TaskExecutor` instead of a raw mpsc sender, so
//! tests can swap in a fake executor that records what was scheduled and
//! emits `TaskCompleted` events directly.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::{PipelineError, Result};
use crate::pipeline::Pipeline;
use crate::types::BoxFuture;

use super::executor_loop::spawn_executor;

/// Trait abstracting how scheduled tasks are executed.
pub trait TaskExecutor: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// Implementations must eventually answer every task with a
    /// `RuntimeEvent::TaskCompleted`.
    fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> BoxFuture<'_, Result<()>>;
}

/// Production executor: forwards scheduled tasks to the background executor
/// loop, which runs them against the [`Pipeline`].
#[derive(Debug)]
pub struct PipelineExecutor {
    tx: mpsc::Sender<ScheduledTask>,
}

impl PipelineExecutor {
    /// Create the executor, wiring it to the given runtime event sender.
    ///
    /// This spawns the background executor loop immediately.
    pub fn new(pipeline: Arc<Pipeline>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(pipeline, runtime_tx);
        Self { tx }
    }
}

impl TaskExecutor for PipelineExecutor {
    fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> BoxFuture<'_, Result<()>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for task in tasks {
                tx.send(task)
                    .await
                    .map_err(|e| PipelineError::Other(anyhow!("executor loop gone: {e}")))?;
            }
            Ok(())
        })
    }
}
