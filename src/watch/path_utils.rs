// src/watch/path_utils.rs

//! Turning watcher event paths into project-relative strings.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First try a direct `strip_prefix(root)`.
/// - If that fails (symlinks, `/private/var` on macOS, ...), canonicalize
///   both paths and try again. A removed file can no longer be
///   canonicalized, so its parent is canonicalized instead.
///
/// Returns `None` if the path is not below `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_forward_slashes(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };

    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(to_forward_slashes)
}

fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_root_prefix() {
        assert_eq!(
            relative_str(Path::new("/proj"), Path::new("/proj/app/js/main.js")).as_deref(),
            Some("app/js/main.js")
        );
    }

    #[test]
    fn unrelated_paths_yield_none() {
        assert_eq!(
            relative_str(Path::new("/proj-does-not-exist"), Path::new("/elsewhere/x.js")),
            None
        );
    }

    #[test]
    fn deleted_files_resolve_through_their_parent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("proj");
        std::fs::create_dir_all(root.join("app")).unwrap();
        let link_free = root.canonicalize().unwrap();

        let gone = link_free.join("app").join("gone.scss");
        assert_eq!(relative_str(&root, &gone).as_deref(), Some("app/gone.scss"));
    }
}
