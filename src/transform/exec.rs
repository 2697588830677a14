// src/transform/exec.rs

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use tracing::debug;

use crate::errors::TransformError;
use crate::exec::process::{failure_message, run_captured, shell_quote};
use crate::transform::{Asset, Transform, TransformContext, TransformSpec};
use crate::types::BoxFuture;

pub const KIND: &str = "exec";

/// Run an external tool once per asset.
///
/// The command line is run through the shell. Placeholders:
/// - `{path}`: the source path relative to the project directory.
/// - `{input}`: a temporary file holding the asset; stdin is then closed.
/// - `{output}`: a temporary file the tool writes; its contents replace the
///   asset. Without it, the tool's stdout does.
///
/// A non-zero exit fails the transform, naming the file.
#[derive(Debug, Clone)]
pub struct Exec {
    cmd: String,
    tool: String,
    extname: Option<String>,
}

impl Exec {
    pub fn from_spec(spec: &TransformSpec) -> Result<Self, TransformError> {
        let cmd = spec.require("cmd")?.to_string();
        Ok(Self {
            tool: tool_name(spec, &cmd),
            extname: spec
                .get("extname")
                .map(|e| e.trim_start_matches('.').to_string()),
            cmd,
        })
    }

    async fn run_one(&self, asset: Asset, ctx: &TransformContext) -> Result<Asset, TransformError> {
        let prepared = prepare(&self.tool, &self.cmd, &asset, ctx, self.extname.as_deref())?;
        let shown = ctx.display_path(&asset.source).to_path_buf();

        debug!(task = %ctx.task(), tool = %self.tool, path = ?shown, "running tool");

        let output = run_captured(&prepared.line, prepared.stdin, ctx.project_dir(), ctx.env())
            .await
            .map_err(|e| TransformError::failed(&self.tool, &shown, format!("{e:#}")))?;

        if !output.status.success() {
            return Err(TransformError::failed(
                &self.tool,
                &shown,
                failure_message(&output),
            ));
        }

        let contents = match &prepared.output {
            Some(path) => fs::read(path).map_err(|e| {
                TransformError::failed(
                    &self.tool,
                    &shown,
                    format!("tool did not produce {{output}}: {e}"),
                )
            })?,
            None => output.stdout,
        };

        let asset = asset.with_contents(contents);
        Ok(match &self.extname {
            Some(ext) => asset.with_extension(ext),
            None => asset,
        })
    }
}

impl Transform for Exec {
    fn kind(&self) -> &str {
        KIND
    }

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(assets.len());
            for asset in assets {
                out.push(self.run_one(asset, ctx).await?);
            }
            Ok(out)
        })
    }
}

/// `tool` option, or the first word of the command line.
pub(crate) fn tool_name(spec: &TransformSpec, cmd: &str) -> String {
    spec.get("tool")
        .map(str::to_string)
        .or_else(|| cmd.split_whitespace().next().map(str::to_string))
        .unwrap_or_else(|| KIND.to_string())
}

/// A command line with its placeholders expanded.
pub(crate) struct PreparedCommand {
    pub line: String,
    pub stdin: Option<Vec<u8>>,
    pub output: Option<PathBuf>,
    // Removed (with the files in it) when the command is dropped.
    _scratch: Option<TempDir>,
}

pub(crate) fn prepare(
    tool: &str,
    template: &str,
    asset: &Asset,
    ctx: &TransformContext,
    extname: Option<&str>,
) -> Result<PreparedCommand, TransformError> {
    let shown = ctx.display_path(&asset.source).to_path_buf();
    let scratch_err =
        |e: std::io::Error| TransformError::failed(tool, &shown, format!("temp files: {e}"));

    let mut line = template.replace("{path}", &shell_quote(&shown.to_string_lossy()));
    let uses_input = line.contains("{input}");
    let uses_output = line.contains("{output}");

    let mut scratch = None;
    let mut output = None;
    if uses_input || uses_output {
        let dir = tempfile::Builder::new()
            .prefix("assetpipe-")
            .tempdir()
            .map_err(scratch_err)?;
        let name = asset
            .relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "asset".to_string());

        if uses_input {
            let input_dir = dir.path().join("in");
            fs::create_dir_all(&input_dir).map_err(scratch_err)?;
            let input = input_dir.join(&name);
            fs::write(&input, &asset.contents).map_err(scratch_err)?;
            line = line.replace("{input}", &shell_quote(&input.to_string_lossy()));
        }
        if uses_output {
            let output_dir = dir.path().join("out");
            fs::create_dir_all(&output_dir).map_err(scratch_err)?;
            let mut target = output_dir.join(&name);
            if let Some(ext) = extname {
                target.set_extension(ext);
            }
            line = line.replace("{output}", &shell_quote(&target.to_string_lossy()));
            output = Some(target);
        }
        scratch = Some(dir);
    }

    Ok(PreparedCommand {
        line,
        stdin: (!uses_input).then(|| asset.contents.clone()),
        output,
        _scratch: scratch,
    })
}
