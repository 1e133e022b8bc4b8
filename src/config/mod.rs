// src/config/mod.rs

//! Configuration loading and resolution for wwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config from a file or from CLI flags (`loader.rs`).
//! - Flatten main/run inheritance into per-task values (`resolve.rs`).
//! - Validate the raw shape before any task is built (`validate.rs`).

pub mod loader;
pub mod model;
pub mod resolve;
pub mod validate;

pub use loader::{load_and_validate, load_from_cli, load_from_path, parse_config_str};
pub use model::{ConfigFile, RawConfigFile, RawSection, TaskConfig};
pub use resolve::{parse_duration, DEFAULT_TASK_NAME};
