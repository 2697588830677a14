// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::watch::path_utils::relative_str;

/// A changed path, relative to the project directory with forward slashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: String,
}

impl ChangeEvent {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping the handle stops
/// file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Whether a notify event can change what a task would produce.
///
/// Reads and metadata-only changes (permissions, timestamps) are ignored.
pub fn is_relevant(kind: &EventKind) -> bool {
    !matches!(
        kind,
        EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_))
    )
}

/// Watch `watch_dir` recursively and forward every relevant change as a
/// [`ChangeEvent`] relative to `project_dir`.
pub fn spawn_watcher(
    project_dir: &Path,
    watch_dir: &Path,
    changes_tx: mpsc::Sender<ChangeEvent>,
) -> Result<WatcherHandle> {
    // Canonicalize once so we have a stable base path.
    let root: PathBuf = project_dir
        .canonicalize()
        .unwrap_or_else(|_| project_dir.to_path_buf());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // The receiver only goes away on shutdown.
                let _ = event_tx.send(event);
            }
            Err(err) => {
                warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    watcher
        .watch(watch_dir, RecursiveMode::Recursive)
        .with_context(|| format!("watching {watch_dir:?}"))?;

    info!(dir = ?watch_dir, "file watcher started");

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if !is_relevant(&event.kind) {
                continue;
            }
            debug!(?event, "received notify event");

            for path in event.paths {
                let Some(rel) = relative_str(&root, &path) else {
                    warn!(?path, root = ?root, "could not relativize changed path");
                    continue;
                };
                if changes_tx.send(ChangeEvent::new(rel)).await.is_err() {
                    debug!("change receiver dropped; watcher loop ending");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    #[test]
    fn only_content_and_layout_changes_are_relevant() {
        assert!(is_relevant(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant(&EventKind::Remove(RemoveKind::File)));
        assert!(is_relevant(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(!is_relevant(&EventKind::Access(AccessKind::Read)));
        assert!(!is_relevant(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Permissions
        ))));
    }
}
