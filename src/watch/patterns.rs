// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::GlobSet;

use crate::fs::FileSystem;
use crate::paths::{Category, PathConfig};
use crate::task::Task;
use crate::task::catalog::{CSS, FONTS, HTML, IMAGES, JS, SPRITE};
use crate::task::source::{build_globset, glob_base, rel_string, walk_files};
use crate::types::TaskName;

/// Which task re-runs when files matching `watch` (and not `exclude`) change.
///
/// Paths are relative to the project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBinding {
    pub watch: Vec<String>,
    pub exclude: Vec<String>,
    pub task: TaskName,
    /// Ask the preview to reload after a successful re-run.
    pub notify_on_complete: bool,
}

impl WatchBinding {
    pub fn new(task: impl Into<TaskName>, watch: Vec<String>) -> Self {
        Self {
            watch,
            exclude: Vec::new(),
            task: task.into(),
            notify_on_complete: true,
        }
    }

    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn notify_on_complete(mut self, notify: bool) -> Self {
        self.notify_on_complete = notify;
        self
    }
}

/// Default bindings: each category's watch globs drive its task.
///
/// Bindings whose task is not part of `tasks` (e.g. `sprite` switched off)
/// are left out.
pub fn default_bindings(paths: &PathConfig, tasks: &[Task]) -> Vec<WatchBinding> {
    let table = [
        (Category::Markup, HTML),
        (Category::Style, CSS),
        (Category::Script, JS),
        (Category::Image, IMAGES),
        (Category::Font, FONTS),
        (Category::Sprite, SPRITE),
    ];

    table
        .into_iter()
        .filter(|(_, task)| tasks.iter().any(|t| t.name == *task))
        .map(|(category, task)| WatchBinding::new(task, paths.category(category).watch.clone()))
        .collect()
}

/// Compiled watch/exclude glob patterns for a single binding.
#[derive(Clone)]
pub struct CompiledBinding {
    binding: WatchBinding,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for CompiledBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledBinding")
            .field("task", &self.binding.task)
            .finish_non_exhaustive()
    }
}

impl CompiledBinding {
    pub fn compile(binding: WatchBinding) -> Result<Self> {
        let watch_set = build_globset(&binding.watch)
            .with_context(|| format!("building watch globset for task {}", binding.task))?;
        let exclude_set = if binding.exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(&binding.exclude).with_context(|| {
                    format!("building exclude globset for task {}", binding.task)
                })?,
            )
        };

        Ok(Self {
            binding,
            watch_set,
            exclude_set,
        })
    }

    pub fn binding(&self) -> &WatchBinding {
        &self.binding
    }

    pub fn task(&self) -> &str {
        &self.binding.task
    }

    /// Whether a change to `rel_path` (relative to the project directory,
    /// forward slashes) concerns this binding.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        match &self.exclude_set {
            Some(exclude) => !exclude.is_match(rel_path),
            None => true,
        }
    }

    /// All files below `project_dir` this binding watches, sorted.
    ///
    /// Only the glob bases are walked, not the whole project.
    pub fn matching_files(&self, fs: &dyn FileSystem, project_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for pattern in &self.binding.watch {
            let base = project_dir.join(glob_base(pattern));
            for path in walk_files(fs, &base)? {
                if let Some(rel) = rel_string(project_dir, &path)
                    && self.matches(&rel)
                {
                    files.push(path);
                }
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }
}

/// Compile every binding.
pub fn compile_bindings(bindings: Vec<WatchBinding>) -> Result<Vec<CompiledBinding>> {
    bindings.into_iter().map(CompiledBinding::compile).collect()
}
