// src/logging.rs

//! `tracing` subscriber setup.
//!
//! The filter comes from the `--log-level` flag when given, else from
//! `ASSETPIPE_LOG` (any `EnvFilter` directive such as `debug` or
//! `assetpipe::watch=trace,info`), else `info`. Events go to stderr; stdout
//! carries only the build summary and the dry-run plan.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "ASSETPIPE_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Install the global subscriber. Call once, at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("installing the tracing subscriber")
}

/// An unparsable env value falls back to the default instead of failing
/// startup.
fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.directive());
    }

    env.map(str::trim)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}
