// src/task/runner.rs

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::errors::TaskError;
use crate::fs::FileSystem;
use crate::task::model::Task;
use crate::task::report::TaskReport;
use crate::task::source::resolve_sources;
use crate::transform::{Asset, TransformContext, TransformRegistry};
use crate::types::{EmptyMatchPolicy, TaskName};

/// Suffix of the staging file each output is written to before the rename.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Runs tasks: source resolution, transform chain, staged writes.
///
/// Runs of the same task are serialised; different tasks run concurrently.
pub struct TaskRunner {
    registry: Arc<TransformRegistry>,
    fs: Arc<dyn FileSystem>,
    project_dir: PathBuf,
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
    locks: Mutex<HashMap<TaskName, Arc<tokio::sync::Mutex<()>>>>,
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("project_dir", &self.project_dir)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TaskRunner {
    pub fn new(
        registry: Arc<TransformRegistry>,
        fs: Arc<dyn FileSystem>,
        project_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            fs,
            project_dir: project_dir.into(),
            env: Vec::new(),
            timeout: None,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Export an environment variable to every external tool.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    fn lock_for(&self, task: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(task.to_string()).or_default())
    }

    /// Run a task to completion.
    ///
    /// Any transform failure aborts the task before the first write.
    pub async fn run(&self, task: &Task) -> Result<TaskReport, TaskError> {
        let lock = self.lock_for(&task.name);
        let _guard = lock.lock().await;

        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.run_inner(task)).await {
                Ok(result) => result,
                Err(_) => Err(TaskError::Timeout {
                    task: task.name.clone(),
                    limit,
                }),
            },
            None => self.run_inner(task).await,
        }
    }

    async fn run_inner(&self, task: &Task) -> Result<TaskReport, TaskError> {
        let started = Instant::now();
        let chain = self
            .registry
            .build_chain(&task.chain)
            .map_err(|e| TaskError::from_transform(&task.name, e))?;

        let assets = resolve_sources(self.fs.as_ref(), &self.project_dir, &task.sources)
            .map_err(|e| TaskError::Invalid {
                task: task.name.clone(),
                message: format!("resolving sources: {e:#}"),
            })?;

        if assets.is_empty() {
            return match task.empty_match {
                EmptyMatchPolicy::Error => Err(TaskError::NoMatch {
                    task: task.name.clone(),
                    patterns: task.sources.include.clone(),
                }),
                EmptyMatchPolicy::Warn => {
                    warn!(task = %task.name, patterns = ?task.sources.include, "no files matched");
                    Ok(TaskReport::empty(&task.name))
                }
                EmptyMatchPolicy::Ignore => {
                    debug!(task = %task.name, "no files matched");
                    Ok(TaskReport::empty(&task.name))
                }
            };
        }

        let inputs = assets.len();
        debug!(task = %task.name, inputs, stages = chain.len(), "running transform chain");

        let ctx = TransformContext::new(&task.name, self.project_dir.clone(), Arc::clone(&self.fs))
            .with_env(self.env.clone());
        let produced = chain
            .run(assets, &ctx)
            .await
            .map_err(|e| TaskError::from_transform(&task.name, e))?;

        let findings = ctx.take_findings();
        for finding in &findings {
            warn!(
                task = %finding.task,
                path = ?finding.path,
                "lint: {}",
                finding.message
            );
        }

        let outputs = match &task.dest_dir {
            Some(dest) => self.write_outputs(&task.name, dest, produced)?,
            None => Vec::new(),
        };

        let elapsed = started.elapsed();
        info!(
            task = %task.name,
            inputs,
            outputs = outputs.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "task finished"
        );

        Ok(TaskReport {
            task: task.name.clone(),
            inputs,
            outputs,
            findings,
            elapsed,
        })
    }

    /// Write every asset below `dest` through a `.partial` file and a rename.
    ///
    /// Returns the written paths relative to the project directory.
    fn write_outputs(
        &self,
        task: &str,
        dest: &Path,
        assets: Vec<Asset>,
    ) -> Result<Vec<PathBuf>, TaskError> {
        let mut planned: Vec<(PathBuf, Vec<u8>)> = Vec::with_capacity(assets.len());
        let mut index: HashMap<PathBuf, usize> = HashMap::new();

        for asset in assets {
            if asset
                .relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
            {
                return Err(TaskError::Write {
                    task: task.to_string(),
                    path: asset.relative,
                    message: "output path escapes the destination directory".to_string(),
                });
            }

            let target = dest.join(&asset.relative);
            match index.get(&target) {
                Some(&i) => {
                    warn!(task, path = ?target, "two outputs share a path; keeping the later one");
                    planned[i].1 = asset.contents;
                }
                None => {
                    index.insert(target.clone(), planned.len());
                    planned.push((target, asset.contents));
                }
            }
        }

        for (target, contents) in &planned {
            let full = self.project_dir.join(target);
            let partial = partial_path(&full);

            let written = self
                .fs
                .write(&partial, contents)
                .and_then(|_| self.fs.rename(&partial, &full));

            if let Err(e) = written {
                if self.fs.exists(&partial) {
                    let _ = self.fs.remove_file(&partial);
                }
                return Err(TaskError::Write {
                    task: task.to_string(),
                    path: target.clone(),
                    message: format!("{e:#}"),
                });
            }
            debug!(task, path = ?target, bytes = contents.len(), "wrote output");
        }

        Ok(planned.into_iter().map(|(path, _)| path).collect())
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}
