// src/transform/lint.rs

use tracing::debug;

use crate::errors::TransformError;
use crate::exec::process::{failure_message, run_captured};
use crate::transform::exec::{prepare, tool_name};
use crate::transform::{Asset, Transform, TransformContext, TransformSpec};
use crate::types::BoxFuture;

pub const KIND: &str = "lint";

/// Run a linter on every asset without changing it.
///
/// Placeholders work as for `exec`. A non-zero exit, or a linter that cannot
/// be started, becomes a [`LintFinding`](crate::transform::LintFinding) on the
/// context; the task itself keeps going.
#[derive(Debug, Clone)]
pub struct Lint {
    cmd: String,
    tool: String,
}

impl Lint {
    pub fn from_spec(spec: &TransformSpec) -> Result<Self, TransformError> {
        let cmd = spec.require("cmd")?.to_string();
        Ok(Self {
            tool: tool_name(spec, &cmd),
            cmd,
        })
    }

    async fn check(&self, asset: &Asset, ctx: &TransformContext) {
        let prepared = match prepare(&self.tool, &self.cmd, asset, ctx, None) {
            Ok(p) => p,
            Err(e) => {
                ctx.report_finding(&asset.source, e.to_string());
                return;
            }
        };

        match run_captured(&prepared.line, prepared.stdin, ctx.project_dir(), ctx.env()).await {
            Ok(output) if output.status.success() => {
                debug!(task = %ctx.task(), tool = %self.tool, path = ?asset.source, "lint clean");
            }
            Ok(output) => {
                ctx.report_finding(
                    &asset.source,
                    format!("{}: {}", self.tool, failure_message(&output)),
                );
            }
            Err(e) => {
                ctx.report_finding(
                    &asset.source,
                    format!("{} could not run: {e:#}", self.tool),
                );
            }
        }
    }
}

impl Transform for Lint {
    fn kind(&self) -> &str {
        KIND
    }

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>> {
        Box::pin(async move {
            for asset in &assets {
                self.check(asset, ctx).await;
            }
            Ok(assets)
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[tokio::test]
    async fn failures_become_findings_and_assets_pass_through() {
        let ctx = TransformContext::new("js", PathBuf::new(), Arc::new(MockFileSystem::new()));
        let lint = Lint::from_spec(
            &TransformSpec::new(KIND)
                .option("cmd", "grep -q debugger && { echo 'no-debugger' >&2; exit 1; } || exit 0")
                .option("tool", "eslint"),
        )
        .unwrap();

        let assets = vec![
            Asset::new("app/js/main.js", "main.js", "debugger;"),
            Asset::new("app/js/ok.js", "ok.js", "let a = 1;"),
        ];
        let out = lint.apply(assets.clone(), &ctx).await.unwrap();

        assert_eq!(out, assets);
        let findings = ctx.take_findings();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, PathBuf::from("app/js/main.js"));
        assert!(findings[0].message.starts_with("eslint: exited with code 1"));
    }
}
