// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::errors::Result;
use crate::exec::TaskExecutor;
use crate::task::BuildReport;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Async shell around [`CoreRuntime`]: receives events, applies the core's
/// decisions and hands ready tasks to a [`TaskExecutor`].
pub struct Runtime<E: TaskExecutor> {
    core: CoreRuntime,
    events: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: TaskExecutor> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: TaskExecutor> Runtime<E> {
    pub fn new(core: CoreRuntime, events: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            events,
            executor,
        }
    }

    /// Run until the core asks to stop or every sender is gone, then return
    /// the report of the last run.
    pub async fn run(mut self) -> Result<BuildReport> {
        while let Some(event) = self.events.recv().await {
            debug!(?event, "runtime event");
            let step = self.core.step(event);

            for command in step.commands {
                if let CoreCommand::DispatchTasks(tasks) = command {
                    self.dispatch(tasks).await?;
                }
            }

            if !step.keep_running {
                debug!("runtime stopping");
                return Ok(self.core.into_report());
            }
        }

        info!("runtime event channel closed");
        Ok(self.core.into_report())
    }

    async fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        debug!(
            tasks = ?tasks.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "dispatching"
        );
        self.executor.spawn_ready_tasks(tasks).await
    }
}
