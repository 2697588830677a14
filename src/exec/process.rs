// src/exec/process.rs

//! Shell process helpers shared by the tool transforms and the preview
//! server.

use std::path::Path;
use std::process::{Output, Stdio};

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Build a shell command appropriate for the platform.
pub fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}

/// Quote a value for interpolation into a `sh -c` command line.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-'))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Run `line` to completion, optionally feeding `stdin`, and capture its
/// output. The child is killed if the returned future is dropped.
pub async fn run_captured(
    line: &str,
    stdin: Option<Vec<u8>>,
    cwd: &Path,
    env: &[(String, String)],
) -> Result<Output> {
    let mut cmd = shell_command(line);
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

    if !cwd.as_os_str().is_empty() {
        cmd.current_dir(cwd);
    }
    for (key, value) in env {
        cmd.env(key, value);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning `{line}`"))?;

    // Feed stdin from a separate task so a tool that writes before it has
    // read everything cannot deadlock against us.
    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        tokio::spawn(async move {
            if let Err(e) = pipe.write_all(&input).await {
                debug!(error = %e, "tool closed stdin before reading all input");
            }
        });
    }

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for `{line}`"))?;

    for line in String::from_utf8_lossy(&output.stderr).lines() {
        debug!("stderr: {}", line);
    }

    Ok(output)
}

/// Human-readable summary of a failed run: stderr, else stdout, else the
/// exit status.
pub fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let detail = if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        stdout.trim().to_string()
    };

    match (output.status.code(), detail.is_empty()) {
        (Some(code), true) => format!("exited with code {code}"),
        (Some(code), false) => format!("exited with code {code}: {detail}"),
        (None, true) => "terminated by signal".to_string(),
        (None, false) => format!("terminated by signal: {detail}"),
    }
}
