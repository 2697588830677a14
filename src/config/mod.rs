// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate durations, tool commands and the project layout (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default, parse_str};
pub use model::{
    BuildSection, ConfigFile, FeatureSection, LibsSection, ProjectSection, RawConfigFile,
    ServeSection, ToolsSection, WatchSection,
};
