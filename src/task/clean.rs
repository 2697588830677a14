// src/task/clean.rs

use std::path::Path;

use tracing::{debug, info};

use crate::errors::TaskError;
use crate::fs::FileSystem;

/// Remove the destination root.
///
/// A missing root is not an error.
pub fn clean(fs: &dyn FileSystem, project_dir: &Path, dest_root: &Path) -> Result<(), TaskError> {
    let target = project_dir.join(dest_root);

    let result = if fs.is_dir(&target) {
        fs.remove_dir_all(&target)
    } else if fs.exists(&target) {
        fs.remove_file(&target)
    } else {
        debug!(path = ?target, "nothing to clean");
        return Ok(());
    };

    result.map_err(|e| TaskError::Clean {
        path: dest_root.to_path_buf(),
        message: format!("{e:#}"),
    })?;

    info!(path = ?target, "destination removed");
    Ok(())
}
