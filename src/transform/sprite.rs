// src/transform/sprite.rs

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::errors::TransformError;
use crate::transform::{Asset, Transform, TransformContext, TransformSpec, utf8};
use crate::types::BoxFuture;

pub const KIND: &str = "svg-sprite";

const SVG_NS: &str = r#"xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink""#;

/// Root `<svg>` of one icon: its `viewBox` and the markup between its tags.
#[derive(Debug, PartialEq, Eq)]
struct SvgRoot<'a> {
    view_box: Option<String>,
    body: &'a str,
}

fn view_box(elem: &BytesStart<'_>) -> Option<String> {
    elem.try_get_attribute("viewBox")
        .ok()
        .flatten()
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

/// Find the first `<svg>` element and slice out its children.
fn parse_root(text: &str) -> Result<SvgRoot<'_>, String> {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(elem)) if elem.local_name().as_ref() == b"svg" => {
                return Ok(SvgRoot {
                    view_box: view_box(&elem),
                    body: "",
                });
            }
            Ok(Event::Start(elem)) if elem.local_name().as_ref() == b"svg" => {
                let view_box = view_box(&elem);
                let body_start = reader.buffer_position() as usize;
                let mut depth = 0usize;
                loop {
                    let before = reader.buffer_position() as usize;
                    match reader.read_event() {
                        Ok(Event::Start(_)) => depth += 1,
                        Ok(Event::End(_)) if depth == 0 => {
                            return Ok(SvgRoot {
                                view_box,
                                body: text[body_start..before].trim(),
                            });
                        }
                        Ok(Event::End(_)) => depth -= 1,
                        Ok(Event::Eof) => return Err("<svg> element is not closed".to_string()),
                        Ok(_) => {}
                        Err(e) => {
                            return Err(format!("malformed SVG at byte {}: {e}", reader.error_position()));
                        }
                    }
                }
            }
            Ok(Event::Eof) => return Err("no <svg> element found".to_string()),
            Ok(_) => {}
            Err(e) => {
                return Err(format!("malformed SVG at byte {}: {e}", reader.error_position()));
            }
        }
    }
}

/// Icon id from the path below the glob base: `icons/mail.svg` → `icons-mail`.
pub fn icon_id(relative: &Path) -> String {
    let stem = relative.with_extension("");
    let joined = stem
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("-");
    joined
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteMode {
    /// Nested `<svg id>` elements, one visible at a time through `:target`.
    Stack,
    /// `<symbol id>` elements referenced with `<use href="sprite.svg#id">`.
    Symbol,
}

/// Assemble every SVG input into a single sprite file.
///
/// Non-SVG inputs are dropped. Ids come from [`icon_id`] and must be unique.
#[derive(Debug, Clone)]
pub struct SvgSprite {
    file: PathBuf,
    mode: SpriteMode,
}

impl SvgSprite {
    pub fn from_spec(spec: &TransformSpec) -> Result<Self, TransformError> {
        let mode = match spec.get("mode").unwrap_or("stack") {
            "stack" => SpriteMode::Stack,
            "symbol" => SpriteMode::Symbol,
            other => {
                return Err(TransformError::invalid(
                    KIND,
                    format!("unknown mode '{other}' (expected \"stack\" or \"symbol\")"),
                ));
            }
        };
        Ok(Self {
            file: PathBuf::from(spec.get("file").unwrap_or("sprite.svg")),
            mode,
        })
    }

    fn icon(&self, id: &str, asset: &Asset, ctx: &TransformContext) -> Result<String, TransformError> {
        let text = utf8(KIND, asset)?;
        let root = parse_root(text)
            .map_err(|message| TransformError::failed(KIND, ctx.display_path(&asset.source), message))?;

        let view_box = root
            .view_box
            .map(|vb| format!(r#" viewBox="{vb}""#))
            .unwrap_or_default();
        let body = root.body;

        Ok(match self.mode {
            SpriteMode::Stack => format!(r#"<svg id="{id}"{view_box}>{body}</svg>"#),
            SpriteMode::Symbol => format!(r#"<symbol id="{id}"{view_box}>{body}</symbol>"#),
        })
    }
}

impl Transform for SvgSprite {
    fn kind(&self) -> &str {
        KIND
    }

    fn apply<'a>(
        &'a self,
        assets: Vec<Asset>,
        ctx: &'a TransformContext,
    ) -> BoxFuture<'a, Result<Vec<Asset>, TransformError>> {
        Box::pin(async move {
            let icons: Vec<&Asset> = assets
                .iter()
                .filter(|a| a.extension().as_deref() == Some("svg"))
                .collect();
            let Some(first) = icons.first() else {
                return Ok(Vec::new());
            };

            let mut sprite = format!("<svg {SVG_NS}>");
            if self.mode == SpriteMode::Stack {
                sprite.push_str("<style>:root>svg{display:none}:root>svg:target{display:block}</style>");
            }
            let mut ids = BTreeSet::new();
            for icon in &icons {
                let id = icon_id(&icon.relative);
                if !ids.insert(id.clone()) {
                    return Err(TransformError::failed(
                        KIND,
                        ctx.display_path(&icon.source),
                        format!("sprite id '{id}' is already taken by another icon"),
                    ));
                }
                sprite.push_str(&self.icon(&id, icon, ctx)?);
            }
            sprite.push_str("</svg>\n");

            Ok(vec![Asset::new(
                first.source.clone(),
                self.file.clone(),
                sprite.into_bytes(),
            )])
        })
    }
}
