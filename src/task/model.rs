// src/task/model.rs

use std::path::PathBuf;

use crate::transform::TransformSpec;
use crate::types::{EmptyMatchPolicy, TaskName};

/// Include and exclude globs, relative to the project directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSpec {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl SourceSpec {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }
}

/// A named unit of work: read the matching sources, run them through the
/// chain and write the results below `dest_dir`.
///
/// A task without `dest_dir` only reports (lint).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: TaskName,
    pub sources: SourceSpec,
    pub chain: Vec<TransformSpec>,
    pub dest_dir: Option<PathBuf>,
    pub empty_match: EmptyMatchPolicy,
    /// Tasks that must complete before this one (besides `clean`).
    pub after: Vec<TaskName>,
}

impl Task {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            sources: SourceSpec::default(),
            chain: Vec::new(),
            dest_dir: None,
            empty_match: EmptyMatchPolicy::default(),
            after: Vec::new(),
        }
    }

    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.sources.include.push(pattern.into());
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.sources.exclude.push(pattern.into());
        self
    }

    pub fn sources(mut self, sources: SourceSpec) -> Self {
        self.sources = sources;
        self
    }

    pub fn stage(mut self, spec: TransformSpec) -> Self {
        self.chain.push(spec);
        self
    }

    pub fn dest(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dest_dir = Some(dir.into());
        self
    }

    pub fn empty_match(mut self, policy: EmptyMatchPolicy) -> Self {
        self.empty_match = policy;
        self
    }

    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.after.push(dep.into());
        self
    }
}
