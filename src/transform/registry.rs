// src/transform/registry.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::TransformError;
use crate::transform::{
    Chain, Transform, TransformSpec, concat, exec, fan_out, filter, include, lint, rename, sprite,
    webp_html,
};

/// Builds a transform from its descriptor. The registry is passed along so
/// composite transforms can build their sub-chains.
pub type TransformFactory = Arc<
    dyn Fn(&TransformSpec, &TransformRegistry) -> Result<Box<dyn Transform>, TransformError>
        + Send
        + Sync,
>;

/// Maps transform kinds to factories.
///
/// Production code uses [`TransformRegistry::with_builtins`]; tests register
/// fakes under the same kinds (or new ones) to keep external tools out.
#[derive(Clone)]
pub struct TransformRegistry {
    factories: BTreeMap<String, TransformFactory>,
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TransformRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in transform kind.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(concat::KIND, |spec, _| {
            Ok(Box::new(concat::Concat::from_spec(spec)?))
        });
        registry.register(rename::KIND, |spec, _| {
            Ok(Box::new(rename::Rename::from_spec(spec)?))
        });
        registry.register(include::KIND, |spec, _| {
            Ok(Box::new(include::FileInclude::from_spec(spec)?))
        });
        registry.register(webp_html::KIND, |spec, _| {
            Ok(Box::new(webp_html::WebpHtml::from_spec(spec)?))
        });
        registry.register(sprite::KIND, |spec, _| {
            Ok(Box::new(sprite::SvgSprite::from_spec(spec)?))
        });
        registry.register(filter::KIND, |spec, _| {
            Ok(Box::new(filter::Filter::from_spec(spec)?))
        });
        registry.register(exec::KIND, |spec, _| {
            Ok(Box::new(exec::Exec::from_spec(spec)?))
        });
        registry.register(lint::KIND, |spec, _| {
            Ok(Box::new(lint::Lint::from_spec(spec)?))
        });
        registry.register(fan_out::KIND, |spec, registry| {
            Ok(Box::new(fan_out::FanOut::from_spec(spec, registry)?))
        });
        registry
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&TransformSpec, &TransformRegistry) -> Result<Box<dyn Transform>, TransformError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn build(&self, spec: &TransformSpec) -> Result<Box<dyn Transform>, TransformError> {
        let factory = self
            .factories
            .get(&spec.kind)
            .ok_or_else(|| TransformError::UnknownKind(spec.kind.clone()))?;
        factory(spec, self)
    }

    pub fn build_chain(&self, specs: &[TransformSpec]) -> Result<Chain, TransformError> {
        let stages = specs
            .iter()
            .map(|spec| self.build(spec))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Chain::new(stages))
    }
}
