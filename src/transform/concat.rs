// src/transform/concat.rs

use std::path::PathBuf;

use crate::errors::TransformError;
use crate::transform::{Asset, Transform, TransformContext, TransformSpec};
use crate::types::BoxFuture;

pub const KIND: &str = "concat";

/// Aggregate every input, in order and newline separated, into one file.
#[derive(Debug, Clone)]
pub struct Concat {
    file: PathBuf,
}

impl Concat {
    pub fn from_spec(spec: &TransformSpec) -> Result<Self, TransformError> {
        let file = spec.require("file")?;
        Ok(Self {
            file: PathBuf::from(file),
        })
    }
}

impl Transform for Concat {
    fn kind(&self) -> &str {
        KIND
    }

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        _ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>> {
        Box::pin(async move {
            let Some(first) = assets.first() else {
                return Ok(Vec::new());
            };
            let source = first.source.clone();

            let mut contents = Vec::new();
            for (i, asset) in assets.into_iter().enumerate() {
                if i > 0 {
                    contents.push(b'\n');
                }
                contents.extend(asset.contents);
            }

            Ok(vec![Asset::new(source, self.file.clone(), contents)])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::sync::Arc;

    #[tokio::test]
    async fn joins_inputs_in_order() {
        let ctx = TransformContext::new("libs-js", PathBuf::new(), Arc::new(MockFileSystem::new()));
        let concat = Concat::from_spec(&TransformSpec::new(KIND).option("file", "libs.min.js"))
            .unwrap();

        let out = concat
            .apply(
                vec![
                    Asset::new("a.js", "a.js", "var a;"),
                    Asset::new("b.js", "b.js", "var b;"),
                ],
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].relative, PathBuf::from("libs.min.js"));
        assert_eq!(out[0].contents, b"var a;\nvar b;".to_vec());
    }
}
