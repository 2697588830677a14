// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Build static site assets from glob-matched sources, then watch and live-reload.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// When omitted, `Assetpipe.toml` in the current directory is used if it
    /// exists; otherwise built-in defaults apply.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Name of the destination root directory.
    ///
    /// Overrides `[project].name`; defaults to the current directory's name.
    #[arg(long, value_name = "NAME")]
    pub root: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve config and print the execution plan without running anything.
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    /// The selected target; `watch` when no subcommand was given.
    pub fn target(&self) -> Command {
        self.command.clone().unwrap_or(Command::Watch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Clean the destination tree, then run every build task once.
    Build,
    /// Start the preview server and rebuild on change, alongside a full build.
    Watch,
    /// Run a single task by name, without cleaning.
    Run {
        /// Task name, e.g. `css` or `images`.
        task: String,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
