// src/exec/task_runner.rs

//! Runs one scheduled task and reports the outcome to the runtime.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::pipeline::Pipeline;

/// Execute `task` against the pipeline and send a `TaskCompleted` event.
///
/// A task never fails silently: every run ends with exactly one completion
/// event, even when a transform panics.
pub async fn run_scheduled(
    task: ScheduledTask,
    pipeline: Arc<Pipeline>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    info!(task = %task.name, run_id = task.run_id, "starting task");
    let started = Instant::now();

    let outcome = TaskOutcome::from(pipeline.execute_isolated(&task.name).await);

    match &outcome {
        TaskOutcome::Success(report) => info!(
            task = %task.name,
            run_id = task.run_id,
            outputs = report.outputs.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "task finished"
        ),
        TaskOutcome::Failed(err) => error!(
            task = %task.name,
            run_id = task.run_id,
            error = %err,
            "task failed"
        ),
    }

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        warn!(
            task = %task.name,
            run_id = task.run_id,
            "runtime gone before task completion could be reported"
        );
    }
}
