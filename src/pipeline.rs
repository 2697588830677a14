// src/pipeline.rs

//! The assembled pipeline: paths, configuration, task catalog, task graph
//! and the runner executing tasks against a filesystem.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error};

use crate::config::ConfigFile;
use crate::config::validate::validate_layout;
use crate::dag::{CLEAN, TaskGraph};
use crate::errors::{Result, TaskError};
use crate::fs::FileSystem;
use crate::paths::PathConfig;
use crate::task::{Task, TaskReport, TaskRunner, build_catalog, clean};
use crate::transform::{TransformRegistry, TransformSpec};

/// Environment variable carrying the browser targets to every tool.
pub const BROWSERSLIST_ENV: &str = "BROWSERSLIST";

/// Pick the path layout for a project.
///
/// Root name precedence: `root` (CLI), then `[project].name`, then
/// `fallback_root` (the current directory's name).
pub fn resolve_paths(root: Option<&str>, cfg: &ConfigFile, fallback_root: Option<&str>) -> PathConfig {
    let root = root.or(cfg.project.name.as_deref()).or(fallback_root);
    let paths = PathConfig::with_source_dir(root, &cfg.project.source_dir);
    match &cfg.features.sprite_source {
        Some(sources) => paths.with_sprite_sources(sources.clone()),
        None => paths,
    }
}

/// Everything needed to run `clean` and the build tasks of one project.
#[derive(Debug)]
pub struct Pipeline {
    paths: PathConfig,
    config: ConfigFile,
    tasks: Vec<Task>,
    graph: TaskGraph,
    runner: TaskRunner,
}

impl Pipeline {
    /// Assemble the pipeline for the catalog tasks.
    pub fn new(
        project_dir: impl Into<PathBuf>,
        paths: PathConfig,
        config: ConfigFile,
        registry: Arc<TransformRegistry>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        validate_layout(&paths)?;
        let tasks = build_catalog(&paths, &config)?;
        Self::with_tasks(project_dir, paths, config, tasks, registry, fs)
    }

    /// Assemble a pipeline over an explicit task list.
    pub fn with_tasks(
        project_dir: impl Into<PathBuf>,
        paths: PathConfig,
        config: ConfigFile,
        tasks: Vec<Task>,
        registry: Arc<TransformRegistry>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let graph = TaskGraph::from_tasks(&tasks)?;
        let runner = TaskRunner::new(registry, fs, project_dir)
            .with_env(BROWSERSLIST_ENV, config.features.browsers.join(", "))
            .with_timeout(config.task_timeout());

        Ok(Self {
            paths,
            config,
            tasks,
            graph,
            runner,
        })
    }

    pub fn paths(&self) -> &PathConfig {
        &self.paths
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn project_dir(&self) -> &Path {
        self.runner.project_dir()
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        self.runner.fs()
    }

    /// Run one node of the graph: `clean` or a build task.
    pub async fn execute(&self, name: &str) -> std::result::Result<TaskReport, TaskError> {
        if name == CLEAN {
            clean(
                self.runner.fs().as_ref(),
                self.runner.project_dir(),
                self.paths.dest_root(),
            )?;
            return Ok(TaskReport::empty(CLEAN));
        }

        let Some(task) = self.task(name) else {
            return Err(TaskError::Invalid {
                task: name.to_string(),
                message: "no such task".to_string(),
            });
        };

        debug!(task = %name, "executing task");
        self.runner.run(task).await
    }

    /// [`Pipeline::execute`] on its own tokio task. A panic inside a
    /// transform becomes a failed task instead of unwinding into the caller,
    /// so every run still produces an outcome.
    pub async fn execute_isolated(
        self: &Arc<Self>,
        name: &str,
    ) -> std::result::Result<TaskReport, TaskError> {
        let pipeline = Arc::clone(self);
        let owned = name.to_string();
        match tokio::spawn(async move { pipeline.execute(&owned).await }).await {
            Ok(result) => result,
            Err(join) => {
                let message = if join.is_panic() {
                    format!("task panicked: {}", panic_message(join.into_panic().as_ref()))
                } else {
                    "task was cancelled".to_string()
                };
                error!(task = %name, %message, "task aborted");
                Err(TaskError::Invalid {
                    task: name.to_string(),
                    message,
                })
            }
        }
    }

    /// Human-readable execution plan: stages, then each task's sources,
    /// chain and destination.
    pub fn plan(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "assetpipe plan for '{}'", self.paths.root_name());

        for (i, stage) in self.graph.stages().iter().enumerate() {
            let _ = writeln!(out, "  stage {}: {}", i + 1, stage.join(", "));
        }
        let _ = writeln!(out);

        for task in &self.tasks {
            let _ = writeln!(out, "  - {}", task.name);
            let _ = writeln!(out, "      sources: {:?}", task.sources.include);
            if !task.sources.exclude.is_empty() {
                let _ = writeln!(out, "      exclude: {:?}", task.sources.exclude);
            }
            let chain: Vec<String> = task.chain.iter().map(TransformSpec::to_string).collect();
            let _ = writeln!(out, "      chain: {}", chain.join(" -> "));
            match &task.dest_dir {
                Some(dest) => {
                    let _ = writeln!(out, "      dest: {}", dest.display());
                }
                None => {
                    let _ = writeln!(out, "      dest: (report only)");
                }
            }
            if !task.after.is_empty() {
                let _ = writeln!(out, "      after: {:?}", task.after);
            }
        }

        out
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn pipeline(fs: &MockFileSystem) -> Pipeline {
        let cfg = ConfigFile::default();
        let paths = resolve_paths(Some("site"), &cfg, None);
        Pipeline::new(
            "",
            paths,
            cfg,
            Arc::new(TransformRegistry::with_builtins()),
            Arc::new(fs.clone()),
        )
        .unwrap()
    }

    #[test]
    fn root_name_precedence() {
        let mut cfg = ConfigFile::default();
        assert_eq!(resolve_paths(None, &cfg, Some("web")).root_name(), "web");
        assert_eq!(resolve_paths(None, &cfg, None).root_name(), "dist");

        cfg.project.name = Some("named".to_string());
        assert_eq!(resolve_paths(None, &cfg, Some("web")).root_name(), "named");
        assert_eq!(resolve_paths(Some("cli"), &cfg, Some("web")).root_name(), "cli");
    }

    #[test]
    fn source_dir_as_destination_is_rejected() {
        let cfg = ConfigFile::default();
        let paths = resolve_paths(Some("app"), &cfg, None);
        let result = Pipeline::new(
            "",
            paths,
            cfg,
            Arc::new(TransformRegistry::with_builtins()),
            Arc::new(MockFileSystem::new()),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn clean_node_removes_destination_root() {
        let fs = MockFileSystem::new();
        fs.add_file("site/css/old.css", "x");
        let pipeline = pipeline(&fs);

        let report = pipeline.execute(CLEAN).await.unwrap();
        assert_eq!(report.task, CLEAN);
        assert!(!fs.exists(Path::new("site")));
    }

    #[tokio::test]
    async fn unknown_task_is_invalid() {
        let pipeline = pipeline(&MockFileSystem::new());
        let err = pipeline.execute("nope").await.unwrap_err();
        assert!(matches!(err, TaskError::Invalid { .. }));
    }

    #[test]
    fn plan_lists_stages_and_tasks() {
        let pipeline = pipeline(&MockFileSystem::new());
        let plan = pipeline.plan();
        assert!(plan.contains("stage 1: clean"));
        assert!(plan.contains("  - css"));
        assert!(plan.contains("dest: (report only)"));
    }
}
