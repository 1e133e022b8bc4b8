// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Watch error: {0}")]
    Notify(#[from] notify::Error),

    /// The task root could not be walked at all.
    #[error("cannot watch root {path:?}: {reason}")]
    WatchRoot { path: PathBuf, reason: String },

    /// The PID file is an operator contract; a bad one is never skipped.
    #[error("PID file {path:?}: {reason}")]
    PidFile { path: PathBuf, reason: String },

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task '{0}' already has a live process")]
    AlreadyRunning(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WwatchError>;
