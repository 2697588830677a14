// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::types::EmptyMatchPolicy;

/// Top-level configuration as read from `Assetpipe.toml`.
///
/// ```toml
/// [project]
/// name = "site"
///
/// [features]
/// emit_unminified = true
///
/// [tools]
/// sass = "sass --stdin --no-source-map"
///
/// [watch]
/// debounce = "300ms"
/// ```
///
/// All sections are optional and have defaults matching the site layout this
/// tool was written for.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub features: FeatureSection,

    #[serde(default)]
    pub libs: LibsSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub serve: ServeSection,
}

/// Validated configuration.
///
/// Constructed only through `TryFrom<RawConfigFile>` (see `validate.rs`) so
/// that durations are parsed and cross-field invariants hold.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub project: ProjectSection,
    pub build: BuildSection,
    pub features: FeatureSection,
    pub libs: LibsSection,
    pub tools: ToolsSection,
    pub watch: WatchSection,
    pub serve: ServeSection,
    task_timeout: Option<Duration>,
    debounce: Duration,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        raw: RawConfigFile,
        task_timeout: Option<Duration>,
        debounce: Duration,
    ) -> Self {
        Self {
            project: raw.project,
            build: raw.build,
            features: raw.features,
            libs: raw.libs,
            tools: raw.tools,
            watch: raw.watch,
            serve: raw.serve,
            task_timeout,
            debounce,
        }
    }

    /// Parsed `[build].task_timeout`; `None` means tasks may run forever.
    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout
    }

    /// Parsed `[watch].debounce`.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        // The raw defaults always validate.
        Self::new_unchecked(
            RawConfigFile::default(),
            None,
            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        )
    }
}

pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Destination root name. `None` lets the caller pick (the CLI uses the
    /// current directory's name).
    #[serde(default)]
    pub name: Option<String>,

    /// Directory holding the sources.
    #[serde(default = "default_source_dir")]
    pub source_dir: String,
}

fn default_source_dir() -> String {
    crate::paths::DEFAULT_SOURCE_DIR.to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: None,
            source_dir: default_source_dir(),
        }
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Per-task timeout, e.g. `"2m"`. Unset by default.
    #[serde(default)]
    pub task_timeout: Option<String>,

    /// Per-task override of the empty-match policy, keyed by task name.
    #[serde(default)]
    pub empty_match: BTreeMap<String, EmptyMatchPolicy>,
}

/// `[features]` section: switches between the pipeline variants.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureSection {
    /// Also write the unminified css/js next to the `.min` variant.
    #[serde(default)]
    pub emit_unminified: bool,

    /// Convert TrueType fonts to WOFF + WOFF2 instead of copying them.
    #[serde(default = "default_true")]
    pub font_conversion: bool,

    /// Build an SVG sprite.
    #[serde(default = "default_true")]
    pub sprite: bool,

    /// Replace the sprite source globs (default: every SVG under images).
    #[serde(default)]
    pub sprite_source: Option<Vec<String>>,

    /// Run stylelint/eslint.
    #[serde(default = "default_true")]
    pub lint: bool,

    /// Rewrite `<img>` tags into `<picture>` with a WebP source.
    #[serde(default = "default_true")]
    pub webp_markup: bool,

    /// Browser targets handed to tools through `BROWSERSLIST`.
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_browsers() -> Vec<String> {
    vec!["last 8 versions".to_string()]
}

impl Default for FeatureSection {
    fn default() -> Self {
        Self {
            emit_unminified: false,
            font_conversion: true,
            sprite: true,
            sprite_source: None,
            lint: true,
            webp_markup: true,
            browsers: default_browsers(),
        }
    }
}

/// `[libs]` section: third-party files bundled into `libs.min.*`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibsSection {
    #[serde(default = "default_libs_css")]
    pub css: Vec<String>,

    #[serde(default = "default_libs_js")]
    pub js: Vec<String>,
}

fn default_libs_css() -> Vec<String> {
    vec![
        "node_modules/normalize.css/normalize.css".to_string(),
        "node_modules/slick-carousel/slick/slick.css".to_string(),
        "node_modules/slick-carousel/slick/slick-theme.css".to_string(),
    ]
}

fn default_libs_js() -> Vec<String> {
    vec!["node_modules/slick-carousel/slick/slick.js".to_string()]
}

impl Default for LibsSection {
    fn default() -> Self {
        Self {
            css: default_libs_css(),
            js: default_libs_js(),
        }
    }
}

/// `[tools]` section: shell commands for the external collaborators.
///
/// Commands read the file on stdin and write the result to stdout unless they
/// use the `{input}` / `{output}` placeholders. `{path}` expands to the
/// source path relative to the project directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsSection {
    #[serde(default = "default_sass")]
    pub sass: String,
    #[serde(default = "default_autoprefixer")]
    pub autoprefixer: String,
    #[serde(default = "default_clean_css")]
    pub clean_css: String,
    #[serde(default = "default_babel")]
    pub babel: String,
    #[serde(default = "default_uglify")]
    pub uglify: String,
    #[serde(default = "default_eslint")]
    pub eslint: String,
    #[serde(default = "default_stylelint")]
    pub stylelint: String,
    #[serde(default = "default_webp")]
    pub webp: String,
    #[serde(default = "default_imagemin")]
    pub imagemin: String,
    #[serde(default = "default_ttf2woff")]
    pub ttf2woff: String,
    #[serde(default = "default_ttf2woff2")]
    pub ttf2woff2: String,
    /// Optional post-processor adding WebP background rules to the css.
    #[serde(default)]
    pub webp_css: Option<String>,
}

fn default_sass() -> String {
    "sass --stdin --no-source-map --style=compressed".to_string()
}
fn default_autoprefixer() -> String {
    "postcss --use autoprefixer --no-map".to_string()
}
fn default_clean_css() -> String {
    "cleancss".to_string()
}
fn default_babel() -> String {
    "babel --filename {path}".to_string()
}
fn default_uglify() -> String {
    "terser --compress --mangle".to_string()
}
fn default_eslint() -> String {
    "eslint --stdin --stdin-filename {path}".to_string()
}
fn default_stylelint() -> String {
    "stylelint --stdin-filename {path}".to_string()
}
fn default_webp() -> String {
    "cwebp -quiet -q 70 {input} -o {output}".to_string()
}
fn default_imagemin() -> String {
    "imagemin {input}".to_string()
}
fn default_ttf2woff() -> String {
    "ttf2woff {input} {output}".to_string()
}
fn default_ttf2woff2() -> String {
    "ttf2woff2".to_string()
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            sass: default_sass(),
            autoprefixer: default_autoprefixer(),
            clean_css: default_clean_css(),
            babel: default_babel(),
            uglify: default_uglify(),
            eslint: default_eslint(),
            stylelint: default_stylelint(),
            webp: default_webp(),
            imagemin: default_imagemin(),
            ttf2woff: default_ttf2woff(),
            ttf2woff2: default_ttf2woff2(),
            webp_css: None,
        }
    }
}

impl ToolsSection {
    /// All configured commands with their key, for validation and dry-run.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        let mut entries = vec![
            ("sass", self.sass.as_str()),
            ("autoprefixer", self.autoprefixer.as_str()),
            ("clean_css", self.clean_css.as_str()),
            ("babel", self.babel.as_str()),
            ("uglify", self.uglify.as_str()),
            ("eslint", self.eslint.as_str()),
            ("stylelint", self.stylelint.as_str()),
            ("webp", self.webp.as_str()),
            ("imagemin", self.imagemin.as_str()),
            ("ttf2woff", self.ttf2woff.as_str()),
            ("ttf2woff2", self.ttf2woff2.as_str()),
        ];
        if let Some(cmd) = &self.webp_css {
            entries.push(("webp_css", cmd.as_str()));
        }
        entries
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Quiet period after the last change before a task re-runs.
    #[serde(default = "default_debounce")]
    pub debounce: String,

    /// Skip re-runs when the watched files' contents did not change.
    #[serde(default)]
    pub use_hash: bool,
}

fn default_debounce() -> String {
    format!("{DEFAULT_DEBOUNCE_MS}ms")
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
            use_hash: false,
        }
    }
}

/// `[serve]` section: the external preview server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServeSection {
    /// Long-running preview server command; `{root}` expands to the
    /// destination root. Unset means no server is started.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Command run after each successful rebuild; unset means reloads are
    /// only logged.
    #[serde(default)]
    pub reload_cmd: Option<String>,
}
