// src/paths.rs

//! Path resolution: logical asset categories → source globs and destination
//! directories.
//!
//! A [`PathConfig`] is built once at startup from the project root name and is
//! passed explicitly to the task catalog and the watch bindings. It is never
//! mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Root name used when none (or a blank one) is supplied.
pub const DEFAULT_ROOT_NAME: &str = "dist";

/// Directory holding the sources, relative to the project directory.
pub const DEFAULT_SOURCE_DIR: &str = "app";

/// Logical asset category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Markup,
    Script,
    Style,
    Image,
    Font,
    Sprite,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Markup,
        Category::Script,
        Category::Style,
        Category::Image,
        Category::Font,
        Category::Sprite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Markup => "markup",
            Category::Script => "script",
            Category::Style => "style",
            Category::Image => "image",
            Category::Font => "font",
            Category::Sprite => "sprite",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source and destination patterns for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPaths {
    /// Include globs, relative to the project directory.
    pub sources: Vec<String>,
    /// Exclude globs, relative to the project directory.
    pub excludes: Vec<String>,
    /// Globs whose changes should re-run the category's task in watch mode.
    pub watch: Vec<String>,
    /// Output directory, relative to the project directory.
    pub dest_dir: PathBuf,
}

/// Immutable mapping of every category to its paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConfig {
    root_name: String,
    source_dir: String,
    categories: BTreeMap<Category, CategoryPaths>,
}

impl PathConfig {
    /// Resolve paths for the given root name with the default `app` source
    /// directory.
    pub fn resolve(root: Option<&str>) -> Self {
        Self::with_source_dir(root, DEFAULT_SOURCE_DIR)
    }

    /// Resolve paths for the given root name and source directory.
    ///
    /// Pure: no filesystem access, no error cases. A missing or blank root
    /// name falls back to [`DEFAULT_ROOT_NAME`].
    pub fn with_source_dir(root: Option<&str>, source_dir: &str) -> Self {
        let root_name = match root.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => DEFAULT_ROOT_NAME.to_string(),
        };
        let src = source_dir.trim().trim_end_matches('/');
        let src = if src.is_empty() { DEFAULT_SOURCE_DIR } else { src };
        let dest = PathBuf::from(&root_name);
        let images = format!("{src}/images/**/*.{{jpg,jpeg,png,svg,gif,ico,webp}}");
        let sprites = format!("{src}/images/**/*.svg");

        let mut categories = BTreeMap::new();
        categories.insert(
            Category::Markup,
            CategoryPaths {
                sources: vec![format!("{src}/*.html")],
                excludes: vec![format!("{src}/_*.html")],
                watch: vec![format!("{src}/**/*.html")],
                dest_dir: dest.clone(),
            },
        );
        categories.insert(
            Category::Script,
            CategoryPaths {
                sources: vec![format!("{src}/js/main.js")],
                excludes: Vec::new(),
                watch: vec![format!("{src}/js/**/*.js")],
                dest_dir: dest.join("js"),
            },
        );
        categories.insert(
            Category::Style,
            CategoryPaths {
                sources: vec![format!("{src}/scss/style.scss")],
                excludes: Vec::new(),
                watch: vec![format!("{src}/scss/**/*.scss")],
                dest_dir: dest.join("css"),
            },
        );
        categories.insert(
            Category::Image,
            CategoryPaths {
                sources: vec![images.clone()],
                excludes: Vec::new(),
                watch: vec![images],
                dest_dir: dest.join("img"),
            },
        );
        categories.insert(
            Category::Font,
            CategoryPaths {
                sources: vec![format!("{src}/fonts/**/*.ttf")],
                excludes: Vec::new(),
                watch: vec![format!("{src}/fonts/**/*.*")],
                dest_dir: dest.join("fonts"),
            },
        );
        categories.insert(
            Category::Sprite,
            CategoryPaths {
                sources: vec![sprites.clone()],
                excludes: Vec::new(),
                watch: vec![sprites],
                dest_dir: dest.join("img"),
            },
        );

        Self {
            root_name,
            source_dir: src.to_string(),
            categories,
        }
    }

    /// Name of the destination root (also the directory `clean` removes).
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Destination root, relative to the project directory.
    pub fn dest_root(&self) -> &Path {
        Path::new(&self.root_name)
    }

    /// Source directory, relative to the project directory.
    pub fn source_dir(&self) -> &str {
        &self.source_dir
    }

    pub fn category(&self, category: Category) -> &CategoryPaths {
        // Every category is inserted by the constructor.
        &self.categories[&category]
    }

    pub fn categories(&self) -> impl Iterator<Item = (Category, &CategoryPaths)> {
        self.categories.iter().map(|(c, p)| (*c, p))
    }

    /// Return a copy whose sprite sources (and watch globs) are replaced.
    ///
    /// The two site configurations this tool grew out of differ in which
    /// files feed the sprite; this keeps that a configuration choice.
    pub fn with_sprite_sources(mut self, sources: Vec<String>) -> Self {
        if let Some(paths) = self.categories.get_mut(&Category::Sprite) {
            paths.watch = sources.clone();
            paths.sources = sources;
        }
        self
    }
}
