// src/exec/mod.rs

//! Execution layer.
//!
//! - [`backend`] provides the `TaskExecutor` trait the runtime dispatches
//!   to, and the production `PipelineExecutor`. Tests replace it with a
//!   fake.
//! - [`executor_loop`] owns the background loop that spawns one Tokio task
//!   per scheduled task.
//! - [`task_runner`] runs a single scheduled task and reports its outcome.
//! - [`process`] wraps `tokio::process` for the external tools.
//! - [`preview`] keeps the preview server process alive during `watch`.

pub mod backend;
pub mod executor_loop;
pub mod preview;
pub mod process;
pub mod task_runner;

pub use backend::{PipelineExecutor, TaskExecutor};
pub use executor_loop::spawn_executor;
pub use preview::PreviewServer;
