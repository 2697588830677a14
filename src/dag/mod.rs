// src/dag/mod.rs

//! Task graph and scheduling.
//!
//! - [`graph`] composes build tasks with the synthetic `clean` and `serve`
//!   nodes and rejects cycles.
//! - [`scheduler`] contains the per-run state machine that decides
//!   which tasks are ready to run, and which are skipped after a failure.
//! - [`task_info`] provides task metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::{CLEAN, SERVE, TaskGraph};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
