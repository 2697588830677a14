// src/transform/rename.rs

use crate::errors::TransformError;
use crate::transform::{Asset, Transform, TransformContext, TransformSpec};
use crate::types::BoxFuture;

pub const KIND: &str = "rename";

/// Rewrite the file name of every asset.
///
/// `basename` replaces the stem, `prefix`/`suffix` wrap it and `extname`
/// replaces the last extension (`".css"` and `"css"` are equivalent). The
/// directory below the destination is kept.
#[derive(Debug, Clone, Default)]
pub struct Rename {
    prefix: String,
    suffix: String,
    basename: Option<String>,
    extname: Option<String>,
}

impl Rename {
    pub fn from_spec(spec: &TransformSpec) -> Result<Self, TransformError> {
        let rename = Self {
            prefix: spec.get("prefix").unwrap_or_default().to_string(),
            suffix: spec.get("suffix").unwrap_or_default().to_string(),
            basename: spec.get("basename").map(str::to_string),
            extname: spec
                .get("extname")
                .map(|e| e.trim_start_matches('.').to_string()),
        };

        if rename.prefix.is_empty()
            && rename.suffix.is_empty()
            && rename.basename.is_none()
            && rename.extname.is_none()
        {
            return Err(TransformError::invalid(
                KIND,
                "expected at least one of prefix, suffix, basename or extname",
            ));
        }
        if let Some(base) = &rename.basename {
            if base.contains('/') || base.is_empty() {
                return Err(TransformError::invalid(
                    KIND,
                    format!("basename '{base}' must be a plain file stem"),
                ));
            }
        }

        Ok(rename)
    }

    fn rename(&self, mut asset: Asset) -> Asset {
        let stem = match &self.basename {
            Some(base) => base.clone(),
            None => asset
                .relative
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let ext = match &self.extname {
            Some(ext) => ext.clone(),
            None => asset
                .relative
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        let mut name = format!("{}{}{}", self.prefix, stem, self.suffix);
        if !ext.is_empty() {
            name.push('.');
            name.push_str(&ext);
        }
        asset.relative.set_file_name(name);
        asset
    }
}

impl Transform for Rename {
    fn kind(&self) -> &str {
        KIND
    }

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        _ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>> {
        Box::pin(async move { Ok(assets.into_iter().map(|a| self.rename(a)).collect()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn suffix_goes_before_extension() {
        let rename =
            Rename::from_spec(&TransformSpec::new(KIND).option("suffix", ".min")).unwrap();
        let out = rename.rename(Asset::new("x", "sub/style.css", ""));
        assert_eq!(out.relative, PathBuf::from("sub/style.min.css"));
    }

    #[test]
    fn extname_replaces_last_extension() {
        let rename =
            Rename::from_spec(&TransformSpec::new(KIND).option("extname", ".min.css")).unwrap();
        let out = rename.rename(Asset::new("x", "style.css", ""));
        assert_eq!(out.relative, PathBuf::from("style.min.css"));
    }

    #[test]
    fn empty_rename_is_rejected() {
        assert!(Rename::from_spec(&TransformSpec::new(KIND)).is_err());
    }
}
