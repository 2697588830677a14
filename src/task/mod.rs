// src/task/mod.rs

//! Build tasks.
//!
//! - [`model`] defines [`Task`] and [`SourceSpec`].
//! - [`catalog`] derives the fixed task set from paths and configuration.
//! - [`source`] resolves globs into assets.
//! - [`runner`] runs one task: sources, chain, staged writes.
//! - [`clean`] removes the destination root.
//! - [`report`] holds per-task and per-build results.

pub mod catalog;
pub mod clean;
pub mod model;
pub mod report;
pub mod runner;
pub mod source;

pub use catalog::build_catalog;
pub use clean::clean;
pub use model::{SourceSpec, Task};
pub use report::{BuildReport, TaskReport, TaskResult};
pub use runner::TaskRunner;
