// src/transform/webp_html.rs

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::errors::TransformError;
use crate::transform::{Asset, Transform, TransformContext, TransformSpec, utf8};
use crate::types::BoxFuture;

pub const KIND: &str = "webp-html";

/// Either a whole `<picture>` element (left untouched) or a bare `<img>` tag.
static PICTURE_OR_IMG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<picture\b.*?</picture\s*>|<img\b[^>]*>").expect("static regex")
});

static RASTER_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']+)\.(jpe?g|png)["']"#).expect("static regex")
});

/// Wrap raster `<img>` tags in a `<picture>` offering the WebP variant.
#[derive(Debug, Clone, Default)]
pub struct WebpHtml;

impl WebpHtml {
    pub fn from_spec(_spec: &TransformSpec) -> Result<Self, TransformError> {
        Ok(Self)
    }
}

/// Rewrite one HTML document.
pub fn rewrite(html: &str) -> String {
    PICTURE_OR_IMG
        .replace_all(html, |caps: &Captures<'_>| {
            let tag = &caps[0];
            if tag
                .get(..8)
                .is_some_and(|head| head.eq_ignore_ascii_case("<picture"))
            {
                return tag.to_string();
            }
            match RASTER_SRC.captures(tag) {
                Some(src) => format!(
                    r#"<picture><source srcset="{}.webp" type="image/webp">{}</picture>"#,
                    &src[1], tag
                ),
                None => tag.to_string(),
            }
        })
        .into_owned()
}

impl Transform for WebpHtml {
    fn kind(&self) -> &str {
        KIND
    }

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        _ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>> {
        Box::pin(async move {
            let mut out = Vec::with_capacity(assets.len());
            for asset in assets {
                let html = rewrite(utf8(KIND, &asset)?);
                out.push(asset.with_contents(html.into_bytes()));
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_image_is_wrapped() {
        let out = rewrite(r#"<p><img src="img/cat.jpg" alt="cat"></p>"#);
        assert_eq!(
            out,
            r#"<p><picture><source srcset="img/cat.webp" type="image/webp"><img src="img/cat.jpg" alt="cat"></picture></p>"#
        );
    }

    #[test]
    fn existing_picture_and_svg_are_left_alone() {
        let html = r#"<picture><img src="a.png"></picture><img src="logo.svg">"#;
        assert_eq!(rewrite(html), html);
    }

    #[test]
    fn multibyte_attributes_do_not_split_characters() {
        let out = rewrite("<p><img a中 src=\"x.png\"></p>");
        assert_eq!(
            out,
            "<p><picture><source srcset=\"x.webp\" type=\"image/webp\"><img a中 src=\"x.png\"></picture></p>"
        );
        assert_eq!(rewrite("<img 中>"), "<img 中>");
    }

    #[test]
    fn rewriting_twice_is_stable() {
        let once = rewrite(r#"<img src='b.PNG'>"#);
        assert_eq!(rewrite(&once), once);
    }
}
