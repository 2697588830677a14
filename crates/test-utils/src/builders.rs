#![allow(dead_code)]

use assetpipe::config::{ConfigFile, RawConfigFile};
use assetpipe::dag::TaskGraph;
use assetpipe::task::Task;
use assetpipe::types::EmptyMatchPolicy;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the defaults with the external preview and linters off, so
/// tests only opt into what they exercise.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.features.lint = false;
        Self { config }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.config.project.name = Some(name.to_string());
        self
    }

    pub fn with_source_dir(mut self, dir: &str) -> Self {
        self.config.project.source_dir = dir.to_string();
        self
    }

    pub fn with_lint(mut self, on: bool) -> Self {
        self.config.features.lint = on;
        self
    }

    pub fn with_emit_unminified(mut self, on: bool) -> Self {
        self.config.features.emit_unminified = on;
        self
    }

    pub fn with_font_conversion(mut self, on: bool) -> Self {
        self.config.features.font_conversion = on;
        self
    }

    pub fn with_sprite(mut self, on: bool) -> Self {
        self.config.features.sprite = on;
        self
    }

    pub fn with_webp_markup(mut self, on: bool) -> Self {
        self.config.features.webp_markup = on;
        self
    }

    pub fn with_libs(mut self, css: &[&str], js: &[&str]) -> Self {
        self.config.libs.css = css.iter().map(|s| s.to_string()).collect();
        self.config.libs.js = js.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_empty_match(mut self, task: &str, policy: EmptyMatchPolicy) -> Self {
        self.config.build.empty_match.insert(task.to_string(), policy);
        self
    }

    pub fn with_task_timeout(mut self, timeout: &str) -> Self {
        self.config.build.task_timeout = Some(timeout.to_string());
        self
    }

    pub fn with_debounce(mut self, debounce: &str) -> Self {
        self.config.watch.debounce = debounce.to_string();
        self
    }

    pub fn with_use_hash(mut self, on: bool) -> Self {
        self.config.watch.use_hash = on;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Graph over bare tasks, each given as `(name, after)`.
pub fn graph_of(tasks: &[(&str, &[&str])]) -> TaskGraph {
    let tasks: Vec<Task> = tasks
        .iter()
        .map(|(name, after)| {
            after
                .iter()
                .fold(Task::new(*name), |task, dep| task.after(*dep))
        })
        .collect();
    TaskGraph::from_tasks(&tasks).expect("valid test graph")
}
