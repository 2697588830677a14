// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state (scheduler plus the build report so far)
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - handling Ctrl+C / shutdown
//!
//! The core is unit tested without any Tokio, channels, filesystem, or
//! processes.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{CoreStep, handle_task_completion, handle_task_trigger};
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::task::BuildReport;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    report: BuildReport,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler, options: RuntimeOptions) -> Self {
        Self {
            scheduler,
            report: BuildReport::new(),
            options,
        }
    }

    /// Expose whether the scheduler is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Results recorded for the current (or last) run.
    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn into_report(self) -> BuildReport {
        self.report
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task } => {
                handle_task_trigger(&mut self.scheduler, &mut self.report, &self.options, task)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => handle_task_completion(
                &mut self.scheduler,
                &mut self.report,
                &self.options,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{CLEAN, TaskGraph};
    use crate::engine::{CoreCommand, TaskOutcome};
    use crate::errors::TaskError;
    use crate::task::{Task, TaskReport, TaskResult};

    fn core() -> CoreRuntime {
        let graph = TaskGraph::from_tasks(&[Task::new("css"), Task::new("js")]).unwrap();
        CoreRuntime::new(Scheduler::from_graph(&graph), RuntimeOptions::default())
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks.iter().map(|t| t.name.clone())),
                CoreCommand::RequestExit => None,
            })
            .flatten()
            .collect()
    }

    fn completed(task: &str, outcome: TaskOutcome) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task: task.to_string(),
            outcome,
        }
    }

    #[test]
    fn clean_failure_skips_every_build_task() {
        let mut core = core();
        let step = core.step(RuntimeEvent::TaskTriggered {
            task: CLEAN.to_string(),
        });
        assert_eq!(dispatched(&step), vec![CLEAN]);

        let err = TaskError::Clean {
            path: "site".into(),
            message: "denied".to_string(),
        };
        let step = core.step(completed(CLEAN, TaskOutcome::Failed(err.clone())));
        assert!(!step.keep_running);
        assert!(dispatched(&step).is_empty());

        let report = core.into_report();
        assert_eq!(report.get(CLEAN), Some(&TaskResult::Failed(err)));
        assert_eq!(
            report.get("css"),
            Some(&TaskResult::Skipped {
                blocked_by: CLEAN.to_string()
            })
        );
        assert_eq!(report.skipped(), vec!["css", "js"]);
    }

    #[test]
    fn exits_once_every_task_reported() {
        let mut core = core();
        core.step(RuntimeEvent::TaskTriggered {
            task: CLEAN.to_string(),
        });
        let step = core.step(completed(CLEAN, TaskOutcome::Success(TaskReport::empty(CLEAN))));
        assert_eq!(dispatched(&step), vec!["css", "js"]);
        assert!(step.keep_running);
        assert!(!core.is_idle());

        core.step(completed("js", TaskOutcome::Success(TaskReport::empty("js"))));
        let step = core.step(completed("css", TaskOutcome::Success(TaskReport::empty("css"))));
        assert!(!step.keep_running);
        assert!(step.commands.contains(&CoreCommand::RequestExit));
        assert!(core.report().is_success());
        assert!(core.is_idle());
    }
}
