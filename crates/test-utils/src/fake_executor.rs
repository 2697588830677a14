use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use assetpipe::dag::ScheduledTask;
use assetpipe::engine::{RuntimeEvent, TaskOutcome};
use assetpipe::errors::{PipelineError, Result, TaskError};
use assetpipe::exec::TaskExecutor;
use assetpipe::task::TaskReport;
use assetpipe::types::BoxFuture;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run", in dispatch order
/// - reports `TaskCompleted` right away: failure for the tasks listed in
///   `failing`, success for every other task.
/// - never reports the tasks listed in `stalling`, which stay running.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
    stalling: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
            stalling: HashSet::new(),
        }
    }

    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }

    pub fn stalling(mut self, task: &str) -> Self {
        self.stalling.insert(task.to_string());
        self
    }
}

impl TaskExecutor for FakeExecutor {
    fn spawn_ready_tasks(&mut self, tasks: Vec<ScheduledTask>) -> BoxFuture<'_, Result<()>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();
        let stalling = self.stalling.clone();

        Box::pin(async move {
            for t in tasks {
                executed.lock().unwrap().push(t.name.clone());
                if stalling.contains(&t.name) {
                    continue;
                }

                let outcome = if failing.contains(&t.name) {
                    TaskOutcome::Failed(TaskError::Invalid {
                        task: t.name.clone(),
                        message: "scripted failure".to_string(),
                    })
                } else {
                    TaskOutcome::Success(TaskReport::empty(t.name.clone()))
                };

                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    outcome,
                })
                .await
                .map_err(|e| PipelineError::Other(anyhow::anyhow!("runtime gone: {e}")))?;
            }
            Ok(())
        })
    }
}
