//! In-process stand-ins for the external tools.
//!
//! [`fake_tool_registry`] keeps every built-in transform but swaps `exec` and
//! `lint` for fakes, so the real catalog can be built without sass, cwebp
//! and friends installed:
//!
//! - fake `exec` prefixes the contents with `/*<tool>*/`, applies `extname`
//!   and fails with a `TransformError::Failed` naming the file when the
//!   input contains [`SYNTAX_ERROR`]. It panics outright on [`TOOL_CRASH`].
//! - fake `lint` reports a finding for every input containing [`LINT_ME`].

use std::sync::{Arc, Mutex};

use assetpipe::errors::TransformError;
use assetpipe::transform::{Asset, Transform, TransformContext, TransformRegistry, TransformSpec};
use assetpipe::types::BoxFuture;

/// Marker making the fake `exec` fail.
pub const SYNTAX_ERROR: &str = "SYNTAX ERROR";

/// Marker making the fake `exec` panic mid-transform.
pub const TOOL_CRASH: &str = "TOOL CRASH";

/// Marker making the fake `lint` report a finding.
pub const LINT_ME: &str = "LINT ME";

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}

#[derive(Debug)]
pub struct FakeExec {
    tool: String,
    extname: Option<String>,
}

impl FakeExec {
    pub fn from_spec(spec: &TransformSpec) -> Result<Self, TransformError> {
        let cmd = spec.require("cmd")?;
        let tool = spec
            .get("tool")
            .map(str::to_string)
            .or_else(|| cmd.split_whitespace().next().map(str::to_string))
            .unwrap_or_else(|| "exec".to_string());
        Ok(Self {
            tool,
            extname: spec.get("extname").map(str::to_string),
        })
    }
}

impl Transform for FakeExec {
    fn kind(&self) -> &str {
        "exec"
    }

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(assets.len());
            for asset in assets {
                if contains(&asset.contents, TOOL_CRASH) {
                    panic!("{} crashed on {}", self.tool, asset.source.display());
                }
                if contains(&asset.contents, SYNTAX_ERROR) {
                    return Err(TransformError::failed(
                        &self.tool,
                        ctx.display_path(&asset.source),
                        "Error: expected \"}\"",
                    ));
                }

                let mut contents = format!("/*{}*/", self.tool).into_bytes();
                contents.extend_from_slice(&asset.contents);
                let mut asset = asset.with_contents(contents);
                if let Some(ext) = &self.extname {
                    asset = asset.with_extension(ext);
                }
                out.push(asset);
            }
            Ok(out)
        })
    }
}

#[derive(Debug)]
pub struct FakeLint {
    tool: String,
}

impl Transform for FakeLint {
    fn kind(&self) -> &str {
        "lint"
    }

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>> {
        Box::pin(async move {
            for asset in &assets {
                if contains(&asset.contents, LINT_ME) {
                    ctx.report_finding(
                        ctx.display_path(&asset.source),
                        format!("{}: unexpected token", self.tool),
                    );
                }
            }
            Ok(assets)
        })
    }
}

/// Built-in registry with `exec` and `lint` faked.
pub fn fake_tool_registry() -> TransformRegistry {
    let mut registry = TransformRegistry::with_builtins();
    registry.register("exec", |spec, _| Ok(Box::new(FakeExec::from_spec(spec)?)));
    registry.register("lint", |spec, _| {
        Ok(Box::new(FakeLint {
            tool: spec.get("tool").unwrap_or("lint").to_string(),
        }))
    });
    registry
}

/// Passes assets through and appends `label` to a shared log on every call.
#[derive(Debug)]
pub struct RecordingTransform {
    label: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl Transform for RecordingTransform {
    fn kind(&self) -> &str {
        "record"
    }

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        _ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>> {
        Box::pin(async move {
            self.log.lock().unwrap().push(self.label.clone());
            Ok(assets
                .into_iter()
                .map(|asset| {
                    let mut contents = asset.contents.clone();
                    contents.extend_from_slice(format!("|{}", self.label).as_bytes());
                    asset.with_contents(contents)
                })
                .collect())
        })
    }
}

/// Always fails, naming the first input.
#[derive(Debug)]
pub struct FailingTransform;

impl Transform for FailingTransform {
    fn kind(&self) -> &str {
        "fail"
    }

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>> {
        Box::pin(async move {
            let path = assets
                .first()
                .map(|a| ctx.display_path(&a.source).to_path_buf())
                .unwrap_or_default();
            Err(TransformError::failed("fail", path, "scripted failure"))
        })
    }
}

/// Register `record` (option `label`) and `fail` on top of `registry`.
///
/// Returns the shared log the `record` stages append to.
pub fn register_test_transforms(registry: &mut TransformRegistry) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let shared = Arc::clone(&log);
    registry.register("record", move |spec, _| {
        Ok(Box::new(RecordingTransform {
            label: spec.get("label").unwrap_or("record").to_string(),
            log: Arc::clone(&shared),
        }))
    });
    registry.register("fail", |_, _| Ok(Box::new(FailingTransform)));
    log
}
