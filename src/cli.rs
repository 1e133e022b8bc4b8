// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Flags describe a single task named `default`. With `--config`, tasks come
//! from a TOML file instead and the per-task flags are ignored.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `wwatch`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "wwatch",
    version,
    about = "Restart a command whenever watched files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory to watch.
    #[arg(long, value_name = "DIR")]
    pub dir: Option<String>,

    /// Working directory for the command.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<String>,

    /// Regex matched against the full path of a changed file.
    #[arg(long = "match", value_name = "REGEX")]
    pub match_pattern: Option<String>,

    /// Comma separated extensions to watch, e.g. `--ext 'less,js'`.
    ///
    /// Replaces `--match`.
    #[arg(long, value_name = "EXTS")]
    pub ext: Option<String>,

    /// Regex for paths that never trigger a restart and are not watched.
    #[arg(long, value_name = "REGEX")]
    pub ignore: Option<String>,

    /// Run the command only after the first file change.
    #[arg(long)]
    pub after: bool,

    /// Quiet period before restarting, e.g. `100ms`, `1.5s`.
    #[arg(long, value_name = "DURATION")]
    pub delay: Option<String>,

    /// Command to run; restarted on every file change.
    #[arg(long, value_name = "CMD")]
    pub cmd: Option<String>,

    /// Command run once before the first start.
    #[arg(long, value_name = "CMD")]
    pub onstart: Option<String>,

    /// File holding the pid of the real payload process.
    #[arg(long, value_name = "PATH")]
    pub pidfile: Option<String>,

    /// Path to a TOML configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Watch subdirectories as well.
    #[arg(long)]
    pub recursive: bool,

    /// Watch dot-files and dot-directories.
    #[arg(long)]
    pub dotfiles: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the tasks, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
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
