// src/watch/hash.rs

//! Content hashing used by `[watch].use_hash` to skip re-runs when the
//! watched files did not actually change.

use std::path::PathBuf;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Hash of a single file's contents.
pub fn compute_file_hash(contents: &[u8]) -> String {
    blake3::hash(contents).to_hex().to_string()
}

/// Deterministic hash over the paths and contents of the given files.
///
/// Order of `paths` does not matter; they are sorted before hashing. Paths
/// take part so that renaming a file changes the hash.
pub fn compute_hash_for_paths(fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<String> {
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();

    let mut hasher = Hasher::new();
    for path in sorted {
        if !fs.is_file(path) {
            continue;
        }
        let contents = fs
            .read(path)
            .with_context(|| format!("reading {path:?} for hashing"))?;
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(compute_file_hash(&contents).as_bytes());
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, files = paths.len(), "computed aggregate hash");
    Ok(hash)
}
