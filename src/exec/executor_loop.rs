// src/exec/executor_loop.rs

//! Background loop turning scheduled tasks into Tokio tasks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::exec::task_runner::run_scheduled;
use crate::pipeline::Pipeline;
use crate::types::TaskName;

/// Spawn the background executor loop.
///
/// The returned sender is what [`PipelineExecutor`](super::PipelineExecutor)
/// uses to hand over scheduled tasks. Each task runs in its own Tokio task,
/// so independent tasks of one stage run in parallel. Two runs of the same
/// task never overlap: the runner serialises them by name.
pub fn spawn_executor(
    pipeline: Arc<Pipeline>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        debug!("executor loop started");

        let mut active: HashMap<TaskName, JoinHandle<()>> = HashMap::new();

        while let Some(task) = rx.recv().await {
            active.retain(|_, handle| !handle.is_finished());

            if active.contains_key(&task.name) {
                info!(
                    task = %task.name,
                    run_id = task.run_id,
                    "previous run still in progress; new run will wait for it"
                );
            }

            let name = task.name.clone();
            let handle = tokio::spawn(run_scheduled(
                task,
                Arc::clone(&pipeline),
                runtime_tx.clone(),
            ));
            active.insert(name, handle);
        }

        debug!(pending = active.len(), "executor loop finished (channel closed)");
    });

    tx
}
