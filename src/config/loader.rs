// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::CliArgs;
use crate::config::model::{ConfigFile, RawConfigFile, RawSection};
use crate::errors::{Result, WwatchError};

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// Relative paths inside the file are later resolved against the file's own
/// directory, so `base_dir` is filled in here.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_config_str(&contents, Some(config_dir(path)))
}

/// Parse TOML text into a `RawConfigFile`.
pub fn parse_config_str(contents: &str, base_dir: Option<PathBuf>) -> Result<RawConfigFile> {
    let mut config: RawConfigFile = toml::from_str(contents)?;
    config.base_dir = base_dir;
    Ok(config)
}

/// Load a configuration file from path and resolve it into tasks.
///
/// - Reads TOML.
/// - Checks that exactly one task source is used (main `cmd` or `[run.*]`).
/// - Applies defaults and inheritance, compiles patterns, parses delays.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// Build the configuration from CLI flags.
///
/// `--config` takes precedence; otherwise the flags describe one task and
/// `--cmd` is required.
pub fn load_from_cli(args: &CliArgs) -> Result<ConfigFile> {
    if let Some(path) = &args.config {
        return load_and_validate(path);
    }

    if args.cmd.as_deref().is_none_or(|c| c.trim().is_empty()) {
        return Err(WwatchError::ConfigError(
            "you should specify --cmd or a path to a configuration file (--config)".to_string(),
        ));
    }

    ConfigFile::try_from(raw_from_cli(args))
}

fn raw_from_cli(args: &CliArgs) -> RawConfigFile {
    let main = RawSection {
        dir: args.dir.clone(),
        cwd: args.cwd.clone(),
        cmd: args.cmd.clone(),
        args: None,
        onstart: args.onstart.clone(),
        pidfile: args.pidfile.clone(),
        match_pattern: args.match_pattern.clone(),
        ext: args.ext.clone(),
        ignore: args.ignore.clone(),
        delay: args.delay.clone(),
        recursive: Some(args.recursive),
        dotfiles: Some(args.dotfiles),
        after: Some(args.after),
    };

    RawConfigFile {
        main,
        run: Default::default(),
        base_dir: None,
    }
}

/// Directory a config file lives in, made absolute when possible.
///
/// A bare filename like `wwatch.toml` has an empty parent, which means the
/// current working directory.
fn config_dir(config_path: &Path) -> PathBuf {
    let parent = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    parent.canonicalize().unwrap_or(parent)
}
