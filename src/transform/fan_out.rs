// src/transform/fan_out.rs

use crate::errors::TransformError;
use crate::transform::{Asset, Chain, Transform, TransformContext, TransformRegistry, TransformSpec};
use crate::types::BoxFuture;

pub const KIND: &str = "fan-out";

/// Run every branch on a copy of the inputs and concatenate the outputs in
/// branch order. An empty branch passes its inputs through unchanged.
#[derive(Debug)]
pub struct FanOut {
    branches: Vec<Chain>,
}

impl FanOut {
    pub fn from_spec(
        spec: &TransformSpec,
        registry: &TransformRegistry,
    ) -> Result<Self, TransformError> {
        if spec.branches.is_empty() {
            return Err(TransformError::invalid(KIND, "at least one branch is required"));
        }
        let branches = spec
            .branches
            .iter()
            .map(|branch| registry.build_chain(branch))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { branches })
    }
}

impl Transform for FanOut {
    fn kind(&self) -> &str {
        KIND
    }

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>> {
        Box::pin(async move {
            let mut out = Vec::new();
            for branch in &self.branches {
                out.extend(branch.run(assets.clone(), ctx).await?);
            }
            Ok(out)
        })
    }
}
