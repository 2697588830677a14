// src/watch/mod.rs

//! Rebuild-on-change.
//!
//! - [`patterns`] defines the watch bindings (globs → task) and compiles
//!   them.
//! - [`coordinator`] is the pure debounce/coalesce state machine.
//! - [`service`] is its async shell: it runs tasks and forwards reloads.
//! - [`watcher`] turns `notify` events into project-relative change events.
//! - [`hash`] backs `[watch].use_hash`.
//! - [`reload`] tells the preview to reload.
//!
//! It does **not** know about the task graph: a change re-runs exactly the
//! bound task, without `clean`.

pub mod coordinator;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod reload;
pub mod service;
pub mod watcher;

pub use coordinator::{Coordinator, CoordinatorCommand, Phase, RunOutcome, SlotState};
pub use patterns::{CompiledBinding, WatchBinding, compile_bindings, default_bindings};
pub use reload::{ChannelReload, CommandReload, LogReload, ReloadNotifier};
pub use service::{ServiceOptions, run_coordinator};
pub use watcher::{ChangeEvent, WatcherHandle, spawn_watcher};
