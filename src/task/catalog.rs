// src/task/catalog.rs

//! The fixed set of build tasks, derived from the paths and the features
//! switched on in the configuration.

use std::collections::BTreeMap;

use crate::config::ConfigFile;
use crate::errors::{PipelineError, Result};
use crate::paths::{Category, PathConfig};
use crate::task::model::{SourceSpec, Task};
use crate::transform::TransformSpec;
use crate::types::EmptyMatchPolicy;

pub const HTML: &str = "html";
pub const CSS: &str = "css";
pub const LIBS_CSS: &str = "libs-css";
pub const JS: &str = "js";
pub const LIBS_JS: &str = "libs-js";
pub const IMAGES: &str = "images";
pub const SPRITE: &str = "sprite";
pub const FONTS: &str = "fonts";
pub const LINTING: &str = "linting";

/// Every task name the catalog can produce, whatever the features.
pub const ALL_TASKS: [&str; 9] = [HTML, CSS, LIBS_CSS, JS, LIBS_JS, IMAGES, SPRITE, FONTS, LINTING];

/// Raster formats the WebP encoder accepts.
const WEBP_INPUTS: &str = "jpg,jpeg,png";

fn exec(tool: &str, cmd: &str) -> TransformSpec {
    TransformSpec::new("exec").option("cmd", cmd).option("tool", tool)
}

fn lint(tool: &str, cmd: &str) -> TransformSpec {
    TransformSpec::new("lint").option("cmd", cmd).option("tool", tool)
}

fn concat(file: &str) -> TransformSpec {
    TransformSpec::new("concat").option("file", file)
}

fn min_suffix() -> TransformSpec {
    TransformSpec::new("rename").option("suffix", ".min")
}

fn category_sources(paths: &PathConfig, category: Category) -> SourceSpec {
    let p = paths.category(category);
    SourceSpec::new(p.sources.clone(), p.excludes.clone())
}

/// Minify stage: either minify in place, or keep the untouched file and add
/// a minified variant next to it.
fn minify_stage(minify: Vec<TransformSpec>, emit_unminified: bool) -> Vec<TransformSpec> {
    if emit_unminified {
        vec![TransformSpec::new("fan-out").branch(Vec::new()).branch(minify)]
    } else {
        minify
    }
}

fn default_policy(task: &str) -> EmptyMatchPolicy {
    match task {
        HTML | CSS | JS => EmptyMatchPolicy::Error,
        LIBS_CSS | LIBS_JS => EmptyMatchPolicy::Warn,
        _ => EmptyMatchPolicy::Ignore,
    }
}

/// Build the task catalog.
///
/// Fails if `[build.empty_match]` names a task the catalog does not know.
pub fn build_catalog(paths: &PathConfig, cfg: &ConfigFile) -> Result<Vec<Task>> {
    validate_overrides(&cfg.build.empty_match)?;

    let tools = &cfg.tools;
    let features = &cfg.features;
    let mut tasks = Vec::new();

    // html
    let mut html = Task::new(HTML)
        .sources(category_sources(paths, Category::Markup))
        .dest(&paths.category(Category::Markup).dest_dir)
        .stage(TransformSpec::new("file-include").option("prefix", "@@"));
    if features.webp_markup {
        html = html.stage(TransformSpec::new("webp-html"));
    }
    tasks.push(html);

    // css
    let mut css = Task::new(CSS)
        .sources(category_sources(paths, Category::Style))
        .dest(&paths.category(Category::Style).dest_dir)
        .stage(exec("sass", &tools.sass).option("extname", "css"))
        .stage(exec("autoprefixer", &tools.autoprefixer));
    if let Some(cmd) = &tools.webp_css {
        css = css.stage(exec("webp-css", cmd));
    }
    for stage in minify_stage(
        vec![exec("clean-css", &tools.clean_css), min_suffix()],
        features.emit_unminified,
    ) {
        css = css.stage(stage);
    }
    tasks.push(css);

    // libs-css
    tasks.push(
        Task::new(LIBS_CSS)
            .sources(SourceSpec::new(cfg.libs.css.clone(), Vec::new()))
            .dest(&paths.category(Category::Style).dest_dir)
            .stage(concat("libs.min.css"))
            .stage(exec("clean-css", &tools.clean_css)),
    );

    // js
    let mut js = Task::new(JS)
        .sources(category_sources(paths, Category::Script))
        .dest(&paths.category(Category::Script).dest_dir);
    if features.lint {
        js = js.stage(lint("eslint", &tools.eslint));
    }
    js = js.stage(exec("babel", &tools.babel));
    let minify = if features.emit_unminified {
        vec![exec("uglify", &tools.uglify), min_suffix()]
    } else {
        vec![exec("uglify", &tools.uglify)]
    };
    for stage in minify_stage(minify, features.emit_unminified) {
        js = js.stage(stage);
    }
    tasks.push(js);

    // libs-js
    tasks.push(
        Task::new(LIBS_JS)
            .sources(SourceSpec::new(cfg.libs.js.clone(), Vec::new()))
            .dest(&paths.category(Category::Script).dest_dir)
            .stage(concat("libs.min.js"))
            .stage(TransformSpec::new("file-include").option("prefix", "@@"))
            .stage(exec("uglify", &tools.uglify)),
    );

    // images
    tasks.push(
        Task::new(IMAGES)
            .sources(category_sources(paths, Category::Image))
            .dest(&paths.category(Category::Image).dest_dir)
            .stage(
                TransformSpec::new("fan-out")
                    .branch(vec![
                        TransformSpec::new("filter").option("ext", WEBP_INPUTS),
                        exec("webp", &tools.webp).option("extname", "webp"),
                    ])
                    .branch(vec![exec("imagemin", &tools.imagemin)]),
            ),
    );

    // sprite
    if features.sprite {
        tasks.push(
            Task::new(SPRITE)
                .sources(category_sources(paths, Category::Sprite))
                .dest(&paths.category(Category::Sprite).dest_dir)
                .stage(
                    TransformSpec::new("svg-sprite")
                        .option("file", "sprite.svg")
                        .option("mode", "stack"),
                ),
        );
    }

    // fonts
    let mut fonts = Task::new(FONTS)
        .sources(category_sources(paths, Category::Font))
        .dest(&paths.category(Category::Font).dest_dir);
    if features.font_conversion {
        fonts = fonts.stage(
            TransformSpec::new("fan-out")
                .branch(vec![exec("ttf2woff", &tools.ttf2woff).option("extname", "woff")])
                .branch(vec![exec("ttf2woff2", &tools.ttf2woff2).option("extname", "woff2")]),
        );
    }
    tasks.push(fonts);

    // linting
    if features.lint {
        tasks.push(
            Task::new(LINTING)
                .sources(category_sources(paths, Category::Style))
                .stage(lint("stylelint", &tools.stylelint)),
        );
    }

    for task in &mut tasks {
        task.empty_match = cfg
            .build
            .empty_match
            .get(&task.name)
            .copied()
            .unwrap_or_else(|| default_policy(&task.name));
    }

    Ok(tasks)
}

fn validate_overrides(overrides: &BTreeMap<String, EmptyMatchPolicy>) -> Result<()> {
    for name in overrides.keys() {
        if !ALL_TASKS.contains(&name.as_str()) {
            return Err(PipelineError::ConfigError(format!(
                "[build.empty_match] names unknown task '{name}' (known: {})",
                ALL_TASKS.join(", ")
            )));
        }
    }
    Ok(())
}
