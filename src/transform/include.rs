// src/transform/include.rs

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::errors::TransformError;
use crate::transform::{Asset, Transform, TransformContext, TransformSpec, utf8};
use crate::types::BoxFuture;

pub const KIND: &str = "file-include";

/// Maximum nesting of included files.
pub const MAX_INCLUDE_DEPTH: usize = 16;

/// Expand `@@include('path')` directives.
///
/// Paths are resolved relative to the file containing the directive and read
/// through the context's filesystem; included files may include others.
/// An optional second argument (`@@include('a.html', {...})`) is accepted and
/// ignored.
#[derive(Debug, Clone)]
pub struct FileInclude {
    directive: Regex,
}

impl FileInclude {
    pub fn from_spec(spec: &TransformSpec) -> Result<Self, TransformError> {
        let prefix = spec.get("prefix").unwrap_or("@@");
        let pattern = format!(
            r#"{}include\(\s*['"]([^'"]+)['"]\s*(?:,[^)]*)?\)"#,
            regex::escape(prefix)
        );
        let directive = Regex::new(&pattern)
            .map_err(|e| TransformError::invalid(KIND, format!("bad prefix '{prefix}': {e}")))?;
        Ok(Self { directive })
    }

    fn expand(
        &self,
        text: &str,
        file: &Path,
        ctx: &TransformContext,
        depth: usize,
    ) -> Result<String, TransformError> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(TransformError::failed(
                KIND,
                ctx.display_path(file),
                format!("includes nested deeper than {MAX_INCLUDE_DEPTH} levels"),
            ));
        }

        let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in self.directive.captures_iter(text) {
            let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);

            let included: PathBuf = dir.join(target.as_str());
            let body = ctx.fs().read_to_string(&included).map_err(|e| {
                TransformError::failed(
                    KIND,
                    ctx.display_path(file),
                    format!("cannot include '{}': {e:#}", target.as_str()),
                )
            })?;
            out.push_str(&self.expand(&body, &included, ctx, depth + 1)?);

            last = whole.end();
        }

        out.push_str(&text[last..]);
        Ok(out)
    }
}

impl Transform for FileInclude {
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
                let text = utf8(KIND, &asset)?;
                let expanded = self.expand(text, &asset.source, ctx, 0)?;
                out.push(asset.clone().with_contents(expanded.into_bytes()));
            }
            Ok(out)
        })
    }
}
