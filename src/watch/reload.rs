// src/watch/reload.rs

//! Reload notifications for the preview.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use tokio::sync::mpsc;
use tracing::info;

use crate::exec::process::{failure_message, run_captured};
use crate::types::BoxFuture;

/// Something that can tell the preview to reload after `task` re-ran.
pub trait ReloadNotifier: Send + Sync + fmt::Debug {
    fn reload<'a>(&'a self, task: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// Only logs. Used when no `[serve].reload_cmd` is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReload;

impl ReloadNotifier for LogReload {
    fn reload<'a>(&'a self, task: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            info!(task = %task, "reload");
            Ok(())
        })
    }
}

/// Runs `[serve].reload_cmd`, e.g. `browser-sync reload`.
#[derive(Debug, Clone)]
pub struct CommandReload {
    cmd: String,
    cwd: PathBuf,
}

impl CommandReload {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }
}

impl ReloadNotifier for CommandReload {
    fn reload<'a>(&'a self, task: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let output = run_captured(&self.cmd, None, &self.cwd, &[]).await?;
            if !output.status.success() {
                bail!("`{}` {}", self.cmd, failure_message(&output));
            }
            info!(task = %task, "reload sent");
            Ok(())
        })
    }
}

/// Sends the task name over a channel; for embedding and tests.
#[derive(Clone)]
pub struct ChannelReload {
    tx: mpsc::UnboundedSender<String>,
}

impl fmt::Debug for ChannelReload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelReload").finish_non_exhaustive()
    }
}

impl ChannelReload {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReloadNotifier for ChannelReload {
    fn reload<'a>(&'a self, task: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.tx
                .send(task.to_string())
                .map_err(|_| anyhow!("reload receiver dropped"))
        })
    }
}
