// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::types::TaskName;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the graph and make
/// assertions about what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    /// Tasks that became ready to run as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// The task that failed in this step, if any.
    pub newly_failed: Vec<TaskName>,
    /// Dependents skipped because of that failure, with the failed task.
    pub newly_skipped: Vec<(TaskName, TaskName)>,
    /// Whether this step caused the current run to finish (i.e. the scheduler
    /// is now idle).
    pub run_just_finished: bool,
}
