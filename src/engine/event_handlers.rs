// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, error};

use crate::dag::{ScheduledTask, Scheduler, TaskRunState};
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome};
use crate::task::{BuildReport, TaskResult};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Request that the runtime stops (the run is over).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute (dispatch tasks, exit).
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a task trigger event.
///
/// - If the scheduler is idle, a new run starts with this trigger.
/// - If a run is active and `task` is not part of it, its downstream
///   component is merged into the current run.
/// - A trigger for a task already in the run is dropped: the run will
///   produce its output anyway.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    report: &mut BuildReport,
    options: &RuntimeOptions,
    task: TaskName,
) -> CoreStep {
    let mut commands = Vec::new();

    if scheduler.is_idle() && scheduler.contains(&task) {
        *report = BuildReport::new();
        scheduler.start_new_run();
    }

    match scheduler.run_state_of(&task) {
        None => {
            error!(task = %task, "trigger for unknown task; ignoring");
        }
        Some(TaskRunState::NotInRun) => {
            let step = scheduler.step_trigger(&task);
            if !step.newly_scheduled.is_empty() {
                commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
            }
        }
        Some(state) => {
            debug!(task = %task, ?state, "task already part of this run; trigger dropped");
        }
    }

    finish_if_idle(scheduler, options, commands)
}

/// Handle a task completion event.
///
/// The outcome is recorded in the build report; a failure also records
/// every dependent it blocked as skipped.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    report: &mut BuildReport,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();

    let step = scheduler.step_completion(&task, &outcome);
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }

    let result = match outcome {
        TaskOutcome::Success(task_report) => TaskResult::Succeeded(task_report),
        TaskOutcome::Failed(err) => {
            error!(task = %task, error = %err, "task failed");
            TaskResult::Failed(err)
        }
    };
    report.record(task, result);

    for (skipped, blocked_by) in step.newly_skipped {
        report.record(skipped, TaskResult::Skipped { blocked_by });
    }

    finish_if_idle(scheduler, options, commands)
}

/// In exit-when-idle mode, stop once the scheduler has nothing left to do.
fn finish_if_idle(
    scheduler: &Scheduler,
    options: &RuntimeOptions,
    mut commands: Vec<CoreCommand>,
) -> CoreStep {
    if options.exit_when_idle && scheduler.is_idle() {
        commands.push(CoreCommand::RequestExit);
        return CoreStep {
            commands,
            keep_running: false,
        };
    }

    CoreStep::continue_with(commands)
}
