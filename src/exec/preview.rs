// src/exec/preview.rs

//! The external preview server (e.g. browser-sync) as a long-lived child
//! process.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tracing::{debug, info};

use super::process::{shell_command, shell_quote};

/// Placeholder in `[serve].cmd` replaced by the destination root.
pub const ROOT_PLACEHOLDER: &str = "{root}";

/// Expand `{root}` in a preview command line.
pub fn render_command(template: &str, root: &str) -> String {
    template.replace(ROOT_PLACEHOLDER, &shell_quote(root))
}

/// Running preview server. Dropping it kills the process.
#[derive(Debug)]
pub struct PreviewServer {
    child: Child,
    command: String,
}

impl PreviewServer {
    /// Start the preview server in `cwd`.
    pub fn start(template: &str, root: &str, cwd: &Path) -> Result<Self> {
        let command = render_command(template, root);
        let mut cmd = shell_command(&command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if !cwd.as_os_str().is_empty() {
            cmd.current_dir(cwd);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("starting preview server `{command}`"))?;

        // Always consume output so buffers don't fill; log at debug.
        if let Some(stdout) = child.stdout.take() {
            forward_lines("stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines("stderr", stderr);
        }

        info!(cmd = %command, "preview server started");
        Ok(Self { child, command })
    }

    /// Wait for the server to exit on its own.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.child
            .wait()
            .await
            .with_context(|| format!("waiting for preview server `{}`", self.command))
    }
}

fn forward_lines<R>(stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(stream, "preview: {}", line);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_placeholder_is_quoted_when_needed() {
        assert_eq!(
            render_command("browser-sync start --server {root}", "site"),
            "browser-sync start --server site"
        );
        assert_eq!(render_command("serve {root}", "my site"), "serve 'my site'");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn server_runs_until_it_exits() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = PreviewServer::start("test -n {root}", "site", dir.path()).unwrap();
        let status = server.wait().await.unwrap();
        assert!(status.success());
    }
}
