// src/dag/task_info.rs

//! Scheduler slots: one per schedulable task.

use crate::types::TaskName;

/// Where a task stands in the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskRunState {
    /// Not part of the current run (or no run is active).
    #[default]
    NotInRun,
    /// Part of the run, waiting on dependencies.
    Pending,
    /// Dispatched to the executor.
    Running,
    DoneSuccess,
    DoneFailed,
    /// Never ran: a dependency failed earlier in the run.
    Skipped,
}

impl TaskRunState {
    /// Whether the task still needs the executor in this run.
    pub fn is_active(self) -> bool {
        matches!(self, TaskRunState::Pending | TaskRunState::Running)
    }
}

/// A schedulable task with its dependencies.
#[derive(Debug, Clone)]
pub struct TaskSlot {
    pub name: TaskName,
    /// `clean` plus the task's `after` list.
    pub deps: Vec<TaskName>,
    pub state: TaskRunState,
}

impl TaskSlot {
    pub fn new(name: impl Into<TaskName>, deps: Vec<TaskName>) -> Self {
        Self {
            name: name.into(),
            deps,
            state: TaskRunState::NotInRun,
        }
    }

    /// Counts as a satisfied dependency for a task in the current run.
    pub fn satisfies_dependents(&self) -> bool {
        self.state == TaskRunState::DoneSuccess
    }
}

/// A task the scheduler hands to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    /// Shared by every task dispatched in the same build run.
    pub run_id: u64,
}
