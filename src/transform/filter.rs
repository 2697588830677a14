// src/transform/filter.rs

use std::collections::BTreeSet;

use crate::errors::TransformError;
use crate::transform::{Asset, Transform, TransformContext, TransformSpec};
use crate::types::BoxFuture;

pub const KIND: &str = "filter";

/// Keep only assets whose extension is listed in `ext` (comma separated,
/// case-insensitive); drop the rest.
#[derive(Debug, Clone)]
pub struct Filter {
    extensions: BTreeSet<String>,
}

impl Filter {
    pub fn from_spec(spec: &TransformSpec) -> Result<Self, TransformError> {
        let extensions: BTreeSet<String> = spec
            .require("ext")?
            .split(',')
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        if extensions.is_empty() {
            return Err(TransformError::invalid(KIND, "'ext' lists no extension"));
        }
        Ok(Self { extensions })
    }
}

impl Transform for Filter {
    fn kind(&self) -> &str {
        KIND
    }

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        _ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>> {
        Box::pin(async move {
            Ok(assets
                .into_iter()
                .filter(|a| {
                    a.extension()
                        .is_some_and(|ext| self.extensions.contains(&ext))
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[tokio::test]
    async fn keeps_listed_extensions_only() {
        let ctx = TransformContext::new("images", PathBuf::new(), Arc::new(MockFileSystem::new()));
        let filter =
            Filter::from_spec(&TransformSpec::new(KIND).option("ext", "jpg, PNG")).unwrap();

        let out = filter
            .apply(
                vec![
                    Asset::new("a.JPG", "a.JPG", ""),
                    Asset::new("b.svg", "b.svg", ""),
                    Asset::new("c.png", "c.png", ""),
                ],
                &ctx,
            )
            .await
            .unwrap();

        let names: Vec<_> = out.iter().map(|a| a.relative.clone()).collect();
        assert_eq!(names, vec![PathBuf::from("a.JPG"), PathBuf::from("c.png")]);
    }
}
