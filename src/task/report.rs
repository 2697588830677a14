// src/task/report.rs

//! Per-task and per-build results.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::TaskError;
use crate::transform::LintFinding;
use crate::types::TaskName;

/// Result of one successful task run.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub task: TaskName,
    /// Number of source files matched.
    pub inputs: usize,
    /// Written files, relative to the project directory.
    pub outputs: Vec<PathBuf>,
    pub findings: Vec<LintFinding>,
    pub elapsed: Duration,
}

impl TaskReport {
    pub fn empty(task: impl Into<TaskName>) -> Self {
        Self {
            task: task.into(),
            inputs: 0,
            outputs: Vec::new(),
            findings: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Final state of a task within one build.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Succeeded(TaskReport),
    Failed(TaskError),
    /// Not run because an upstream task failed.
    Skipped { blocked_by: TaskName },
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Succeeded(_))
    }
}

/// Everything that happened during one build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    results: BTreeMap<TaskName, TaskResult>,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, task: impl Into<TaskName>, result: TaskResult) {
        self.results.insert(task.into(), result);
    }

    pub fn get(&self, task: &str) -> Option<&TaskResult> {
        self.results.get(task)
    }

    pub fn results(&self) -> impl Iterator<Item = (&str, &TaskResult)> {
        self.results.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Tasks that failed, with their error.
    pub fn failures(&self) -> Vec<(&str, &TaskError)> {
        self.results
            .iter()
            .filter_map(|(name, r)| match r {
                TaskResult::Failed(e) => Some((name.as_str(), e)),
                _ => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, TaskResult::Skipped { .. }))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Output paths written by more than one task, with the tasks involved.
    pub fn overlapping_outputs(&self) -> BTreeMap<PathBuf, BTreeSet<TaskName>> {
        let mut owners: BTreeMap<PathBuf, BTreeSet<TaskName>> = BTreeMap::new();
        for (name, result) in &self.results {
            if let TaskResult::Succeeded(report) = result {
                for path in &report.outputs {
                    owners.entry(path.clone()).or_default().insert(name.clone());
                }
            }
        }
        owners.retain(|_, tasks| tasks.len() > 1);
        owners
    }

    /// Every output path of every successful task, sorted.
    pub fn all_outputs(&self) -> Vec<PathBuf> {
        let mut outputs: Vec<PathBuf> = self
            .results
            .values()
            .filter_map(|r| match r {
                TaskResult::Succeeded(report) => Some(report.outputs.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect();
        outputs.sort();
        outputs
    }

    pub fn lint_findings(&self) -> Vec<&LintFinding> {
        self.results
            .values()
            .filter_map(|r| match r {
                TaskResult::Succeeded(report) => Some(report.findings.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// All tasks succeeded and no two wrote the same file.
    pub fn is_success(&self) -> bool {
        self.results.values().all(TaskResult::is_success) && self.overlapping_outputs().is_empty()
    }

    /// Number of problems that make the build fail.
    pub fn problem_count(&self) -> usize {
        self.results.values().filter(|r| !r.is_success()).count()
            + self.overlapping_outputs().len()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, result) in &self.results {
            match result {
                TaskResult::Succeeded(report) => writeln!(
                    f,
                    "  ok       {name:<10} {} file(s) in {:.2}s{}",
                    report.outputs.len(),
                    report.elapsed.as_secs_f64(),
                    match report.findings.len() {
                        0 => String::new(),
                        n => format!(", {n} lint finding(s)"),
                    }
                )?,
                TaskResult::Failed(err) => writeln!(f, "  FAILED   {name:<10} {err}")?,
                TaskResult::Skipped { blocked_by } => {
                    writeln!(f, "  skipped  {name:<10} (blocked by {blocked_by})")?
                }
            }
        }
        for (path, tasks) in self.overlapping_outputs() {
            writeln!(f, "  OVERLAP  {path:?} written by {tasks:?}")?;
        }
        if self.is_success() {
            write!(f, "build succeeded")
        } else {
            write!(f, "build failed: {} problem(s)", self.problem_count())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(task: &str, outputs: &[&str]) -> TaskResult {
        TaskResult::Succeeded(TaskReport {
            outputs: outputs.iter().map(PathBuf::from).collect(),
            ..TaskReport::empty(task)
        })
    }

    #[test]
    fn overlapping_outputs_fail_the_build() {
        let mut report = BuildReport::new();
        report.record("images", ok("images", &["dist/img/a.svg", "dist/img/b.png"]));
        report.record("sprite", ok("sprite", &["dist/img/a.svg"]));

        assert!(!report.is_success());
        let overlap = report.overlapping_outputs();
        assert_eq!(overlap.len(), 1);
        assert_eq!(
            overlap[&PathBuf::from("dist/img/a.svg")],
            BTreeSet::from(["images".to_string(), "sprite".to_string()])
        );
    }

    #[test]
    fn failures_and_skips_are_listed() {
        let mut report = BuildReport::new();
        report.record(
            "clean",
            TaskResult::Failed(TaskError::Clean {
                path: PathBuf::from("dist"),
                message: "permission denied".into(),
            }),
        );
        report.record(
            "css",
            TaskResult::Skipped {
                blocked_by: "clean".into(),
            },
        );

        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.skipped(), vec!["css"]);
        assert_eq!(report.problem_count(), 2);
        assert!(report.to_string().ends_with("build failed: 2 problem(s)"));
    }
}
