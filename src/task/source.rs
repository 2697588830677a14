// src/task/source.rs

//! Source resolution: include/exclude globs → ordered list of assets.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::task::model::SourceSpec;
use crate::transform::Asset;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Leading run of path components without glob metacharacters.
///
/// For a pattern without any metacharacter (a literal file) this is the
/// file's parent directory.
pub fn glob_base(pattern: &str) -> String {
    let components: Vec<&str> = pattern.split('/').collect();
    let literal = components
        .iter()
        .take_while(|c| !c.contains(GLOB_META))
        .count();

    let take = if literal == components.len() {
        literal.saturating_sub(1)
    } else {
        literal
    };
    components[..take].join("/")
}

pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(GLOB_META)
}

/// Compile one glob with `*` not crossing `/`.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?
        .compile_matcher())
}

/// Build a GlobSet from simple string patterns, `*` not crossing `/`.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Forward-slash path of `path` relative to `root`.
pub fn rel_string(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

/// Resolve a task's sources below `project_dir` and read them.
///
/// Order: include-pattern order, then sorted path within each pattern; a
/// file matched by several patterns is kept once. `Asset::relative` is the
/// path below the pattern's glob base.
pub fn resolve_sources(
    fs: &dyn FileSystem,
    project_dir: &Path,
    spec: &SourceSpec,
) -> Result<Vec<Asset>> {
    let excludes = build_globset(&spec.exclude)?;
    let mut seen: HashSet<String> = HashSet::new();
    let mut assets = Vec::new();

    for pattern in &spec.include {
        for (rel, relative) in matches_for_pattern(fs, project_dir, pattern)? {
            if excludes.is_match(&rel) || !seen.insert(rel.clone()) {
                continue;
            }
            let source = project_dir.join(&rel);
            let contents = fs.read(&source)?;
            assets.push(Asset::new(source, relative, contents));
        }
    }

    Ok(assets)
}

/// Project-relative matches of one pattern (sorted), each with its path
/// below the glob base.
fn matches_for_pattern(
    fs: &dyn FileSystem,
    project_dir: &Path,
    pattern: &str,
) -> Result<Vec<(String, PathBuf)>> {
    let pattern = pattern.trim_start_matches("./");
    let base = glob_base(pattern);

    if !is_glob(pattern) {
        let path = project_dir.join(pattern);
        if !fs.is_file(&path) {
            return Ok(Vec::new());
        }
        let relative = Path::new(pattern)
            .strip_prefix(&base)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(pattern));
        return Ok(vec![(pattern.to_string(), relative)]);
    }

    let matcher = compile_glob(pattern)?;
    let base_dir = project_dir.join(&base);
    let mut found = Vec::new();

    for path in walk_files(fs, &base_dir)? {
        let Some(rel) = rel_string(project_dir, &path) else {
            continue;
        };
        if !matcher.is_match(&rel) {
            continue;
        }
        let relative = path
            .strip_prefix(&base_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(&rel));
        found.push((rel, relative));
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

/// Every file below `root`; a missing root yields nothing.
pub fn walk_files(fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !fs.is_dir(root) {
        return Ok(files);
    }

    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn glob_base_stops_at_first_wildcard() {
        assert_eq!(glob_base("app/images/**/*.png"), "app/images");
        assert_eq!(glob_base("app/*.html"), "app");
        assert_eq!(glob_base("app/js/main.js"), "app/js");
        assert_eq!(glob_base("*.css"), "");
    }

    #[test]
    fn star_does_not_cross_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("app/index.html", "i");
        fs.add_file("app/_header.html", "h");
        fs.add_file("app/html/part.html", "p");

        let spec = SourceSpec::new(vec!["app/*.html".into()], vec!["app/_*.html".into()]);
        let assets = resolve_sources(&fs, Path::new(""), &spec).unwrap();

        let rels: Vec<_> = assets.iter().map(|a| a.relative.clone()).collect();
        assert_eq!(rels, vec![PathBuf::from("index.html")]);
    }

    #[test]
    fn nested_images_keep_their_subdirectory() {
        let fs = MockFileSystem::new();
        fs.add_file("./app/images/b.png", "b");
        fs.add_file("./app/images/icons/a.svg", "a");
        fs.add_file("./app/images/readme.txt", "x");

        let spec = SourceSpec::new(
            vec!["app/images/**/*.{png,svg}".into()],
            Vec::new(),
        );
        let assets = resolve_sources(&fs, Path::new("."), &spec).unwrap();

        let rels: Vec<_> = assets.iter().map(|a| a.relative.clone()).collect();
        assert_eq!(
            rels,
            vec![PathBuf::from("b.png"), PathBuf::from("icons/a.svg")]
        );
        assert_eq!(assets[0].source, PathBuf::from("./app/images/b.png"));
    }

    #[test]
    fn literal_files_keep_pattern_order_and_dedupe() {
        let fs = MockFileSystem::new();
        fs.add_file("node_modules/b/b.css", "b");
        fs.add_file("node_modules/a/a.css", "a");

        let spec = SourceSpec::new(
            vec![
                "node_modules/b/b.css".into(),
                "node_modules/a/a.css".into(),
                "node_modules/*/b.css".into(),
                "node_modules/missing.css".into(),
            ],
            Vec::new(),
        );
        let assets = resolve_sources(&fs, Path::new(""), &spec).unwrap();

        let contents: Vec<_> = assets.iter().map(|a| a.contents.clone()).collect();
        assert_eq!(contents, vec![b"b".to_vec(), b"a".to_vec()]);
        assert_eq!(assets[0].relative, PathBuf::from("b.css"));
    }
}
