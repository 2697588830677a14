// src/transform/mod.rs

//! Transform stages applied to the assets of a task.
//!
//! A task's chain is a list of [`TransformSpec`] descriptors. The
//! [`TransformRegistry`] turns them into [`Transform`] objects, and a
//! [`Chain`] applies them strictly in order, each stage receiving the assets
//! produced by the previous one.
//!
//! - [`concat`], [`rename`], [`include`], [`webp_html`], [`sprite`] and
//!   [`filter`] are implemented in-process.
//! - [`exec`] and [`lint`] reach external tools through shell commands.
//! - [`fan_out`] runs several sub-chains on copies of the same inputs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::types::{BoxFuture, TaskName};

pub mod concat;
pub mod exec;
pub mod fan_out;
pub mod filter;
pub mod include;
pub mod lint;
pub mod registry;
pub mod rename;
pub mod sprite;
pub mod webp_html;

pub use registry::{TransformFactory, TransformRegistry};

/// One file flowing through a transform chain.
#[derive(Clone, PartialEq, Eq)]
pub struct Asset {
    /// Path the asset was read from (or, for aggregates, the first input).
    pub source: PathBuf,
    /// Path below the task's destination directory.
    pub relative: PathBuf,
    pub contents: Vec<u8>,
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("source", &self.source)
            .field("relative", &self.relative)
            .field("len", &self.contents.len())
            .finish()
    }
}

impl Asset {
    pub fn new(
        source: impl Into<PathBuf>,
        relative: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            source: source.into(),
            relative: relative.into(),
            contents: contents.into(),
        }
    }

    /// Lower-cased extension of the output path, if any.
    pub fn extension(&self) -> Option<String> {
        self.relative
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    pub fn with_extension(mut self, ext: &str) -> Self {
        self.relative.set_extension(ext.trim_start_matches('.'));
        self
    }

    pub fn with_contents(mut self, contents: Vec<u8>) -> Self {
        self.contents = contents;
        self
    }
}

/// Serializable description of a transform stage.
///
/// `branches` is only meaningful for `fan-out`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformSpec {
    pub kind: String,
    pub options: BTreeMap<String, String>,
    pub branches: Vec<Vec<TransformSpec>>,
}

impl TransformSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            options: BTreeMap::new(),
            branches: Vec::new(),
        }
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn branch(mut self, chain: Vec<TransformSpec>) -> Self {
        self.branches.push(chain);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// A non-blank option, or `TransformError::Invalid`.
    pub fn require(&self, key: &str) -> Result<&str, TransformError> {
        match self.get(key) {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(TransformError::invalid(
                &self.kind,
                format!("missing required option '{key}'"),
            )),
        }
    }
}

impl fmt::Display for TransformSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tool) = self.get("tool") {
            return write!(f, "{}({tool})", self.kind);
        }
        if !self.branches.is_empty() {
            write!(f, "{}[", self.kind)?;
            for (i, branch) in self.branches.iter().enumerate() {
                if i > 0 {
                    f.write_str(" | ")?;
                }
                if branch.is_empty() {
                    f.write_str("copy")?;
                }
                for (j, stage) in branch.iter().enumerate() {
                    if j > 0 {
                        f.write_str(" -> ")?;
                    }
                    write!(f, "{stage}")?;
                }
            }
            return f.write_str("]");
        }
        f.write_str(&self.kind)
    }
}

/// Non-fatal diagnostic produced by a lint-style transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub task: TaskName,
    pub path: PathBuf,
    pub message: String,
}

/// Everything a transform may need besides its inputs.
#[derive(Debug)]
pub struct TransformContext {
    task: TaskName,
    project_dir: PathBuf,
    fs: Arc<dyn FileSystem>,
    env: Vec<(String, String)>,
    findings: Mutex<Vec<LintFinding>>,
}

impl TransformContext {
    pub fn new(task: impl Into<TaskName>, project_dir: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            task: task.into(),
            project_dir,
            fs,
            env: Vec::new(),
            findings: Mutex::new(Vec::new()),
        }
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Environment exported to external tools.
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// `path` relative to the project directory, for messages and `{path}`.
    pub fn display_path<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.project_dir).unwrap_or(path)
    }

    pub fn report_finding(&self, path: &Path, message: impl Into<String>) {
        let finding = LintFinding {
            task: self.task.clone(),
            path: self.display_path(path).to_path_buf(),
            message: message.into(),
        };
        self.findings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(finding);
    }

    pub fn take_findings(&self) -> Vec<LintFinding> {
        std::mem::take(&mut *self.findings.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

/// A single stage of a task's chain.
///
/// Implementations may rewrite contents, rename, fan out (one input, many
/// outputs) or aggregate (many inputs, one output). Returning an error aborts
/// the whole task before anything is written.
pub trait Transform: Send + Sync + fmt::Debug {
    fn kind(&self) -> &str;

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>>;
}

/// Ordered list of built transforms.
#[derive(Debug, Default)]
pub struct Chain {
    stages: Vec<Box<dyn Transform>>,
}

impl Chain {
    pub fn new(stages: Vec<Box<dyn Transform>>) -> Self {
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.kind()).collect()
    }

    /// Apply every stage in declaration order.
    pub async fn run(
        &self,
        mut assets: Vec<Asset>,
        ctx: &TransformContext,
    ) -> Result<Vec<Asset>, TransformError> {
        for stage in &self.stages {
            debug!(
                task = %ctx.task(),
                stage = stage.kind(),
                inputs = assets.len(),
                "applying transform"
            );
            assets = stage.apply(assets, ctx).await?;
        }
        Ok(assets)
    }
}

/// Decode an asset as UTF-8 for the textual transforms.
pub(crate) fn utf8<'a>(tool: &str, asset: &'a Asset) -> Result<&'a str, TransformError> {
    std::str::from_utf8(&asset.contents)
        .map_err(|e| TransformError::failed(tool, &asset.source, format!("invalid UTF-8: {e}")))
}
