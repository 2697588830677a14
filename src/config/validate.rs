// src/config/validate.rs

use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipelineError, Result};
use crate::paths::PathConfig;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_project(&raw)?;
        validate_tools(&raw)?;
        validate_features(&raw)?;
        let task_timeout = parse_task_timeout(&raw)?;
        let debounce = parse_debounce(&raw)?;
        Ok(ConfigFile::new_unchecked(raw, task_timeout, debounce))
    }
}

fn validate_project(cfg: &RawConfigFile) -> Result<()> {
    if let Some(name) = &cfg.project.name {
        validate_root_name(name)?;
    }

    if cfg.project.source_dir.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "[project].source_dir must not be empty".to_string(),
        ));
    }

    Ok(())
}

/// A root name is a single directory name below the project directory.
pub fn validate_root_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::ConfigError(
            "project name must not be empty".to_string(),
        ));
    }
    if trimmed.contains('/') || trimmed.contains('\\') || trimmed == "." || trimmed == ".." {
        return Err(PipelineError::ConfigError(format!(
            "project name '{trimmed}' must be a plain directory name"
        )));
    }
    Ok(())
}

/// Refuse layouts where cleaning the destination would delete sources.
pub fn validate_layout(paths: &PathConfig) -> Result<()> {
    let dest = paths.root_name();
    let source_root = paths
        .source_dir()
        .split('/')
        .find(|c| !c.is_empty() && *c != ".")
        .unwrap_or("");

    if dest == source_root {
        return Err(PipelineError::ConfigError(format!(
            "destination root '{dest}' would overlap source directory '{}'",
            paths.source_dir()
        )));
    }
    Ok(())
}

fn validate_tools(cfg: &RawConfigFile) -> Result<()> {
    for (key, cmd) in cfg.tools.entries() {
        if cmd.trim().is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "[tools].{key} must not be empty"
            )));
        }
    }

    for (key, cmd) in [("cmd", &cfg.serve.cmd), ("reload_cmd", &cfg.serve.reload_cmd)] {
        if let Some(cmd) = cmd {
            if cmd.trim().is_empty() {
                return Err(PipelineError::ConfigError(format!(
                    "[serve].{key} must not be empty when set"
                )));
            }
        }
    }

    Ok(())
}

fn validate_features(cfg: &RawConfigFile) -> Result<()> {
    if let Some(sources) = &cfg.features.sprite_source {
        if sources.is_empty() || sources.iter().any(|s| s.trim().is_empty()) {
            return Err(PipelineError::ConfigError(
                "[features].sprite_source must list at least one non-empty glob".to_string(),
            ));
        }
    }

    for (key, list) in [("css", &cfg.libs.css), ("js", &cfg.libs.js)] {
        if list.iter().any(|s| s.trim().is_empty()) {
            return Err(PipelineError::ConfigError(format!(
                "[libs].{key} contains an empty path"
            )));
        }
    }

    Ok(())
}

fn parse_task_timeout(cfg: &RawConfigFile) -> Result<Option<Duration>> {
    let Some(raw) = &cfg.build.task_timeout else {
        return Ok(None);
    };

    let timeout = parse_duration(raw).map_err(|e| {
        PipelineError::ConfigError(format!("[build].task_timeout: {e}"))
    })?;

    if timeout.is_zero() {
        return Err(PipelineError::ConfigError(
            "[build].task_timeout must be greater than zero".to_string(),
        ));
    }

    Ok(Some(timeout))
}

fn parse_debounce(cfg: &RawConfigFile) -> Result<Duration> {
    parse_duration(&cfg.watch.debounce)
        .map_err(|e| PipelineError::ConfigError(format!("[watch].debounce: {e}")))
}
