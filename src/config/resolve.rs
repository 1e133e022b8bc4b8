// src/config/resolve.rs

//! Flattening of main/run sections into resolved `TaskConfig`s.
//!
//! Inheritance is resolved once, here. A `[run.<name>]` table inherits
//! `dir`, `cwd`, `match`/`ext`, `ignore`, `delay`, `recursive`, `dotfiles` and
//! `after` from the main section; `cmd`, `args`, `onstart` and `pidfile` always
//! belong to the section that declares them.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use regex::Regex;

use crate::config::model::{RawSection, TaskConfig};
use crate::errors::{Result, WwatchError};
use crate::exec::CommandSpec;

/// Name of the task built from the main section (CLI flags or a config
/// without `[run.*]` tables).
pub const DEFAULT_TASK_NAME: &str = "default";

pub const DEFAULT_DIR: &str = ".";
pub const DEFAULT_CWD: &str = ".";
pub const DEFAULT_MATCH_PATTERN: &str = ".*";
pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

/// Resolve one task from its own section and the optional parent (main)
/// section.
pub fn resolve_task(
    name: &str,
    section: &RawSection,
    parent: Option<&RawSection>,
    base_dir: Option<&Path>,
) -> Result<TaskConfig> {
    let command = resolve_command(name, section)?;

    let dir = inherited(&section.dir, parent, |p| &p.dir)
        .unwrap_or_else(|| DEFAULT_DIR.to_string());
    let cwd = inherited(&section.cwd, parent, |p| &p.cwd)
        .unwrap_or_else(|| DEFAULT_CWD.to_string());

    let match_src = own_match_source(section)
        .or_else(|| parent.and_then(own_match_source))
        .unwrap_or_else(|| DEFAULT_MATCH_PATTERN.to_string());
    let match_pattern = Regex::new(&match_src).map_err(|e| {
        WwatchError::ConfigError(format!(
            "task '{name}': invalid match pattern '{match_src}': {e}"
        ))
    })?;

    let ignore_pattern = match inherited(&section.ignore, parent, |p| &p.ignore) {
        Some(pat) if !pat.is_empty() => Some(Regex::new(&pat).map_err(|e| {
            WwatchError::ConfigError(format!(
                "task '{name}': invalid ignore pattern '{pat}': {e}"
            ))
        })?),
        _ => None,
    };

    let delay = match inherited(&section.delay, parent, |p| &p.delay) {
        Some(s) => parse_duration(&s).map_err(|e| {
            WwatchError::ConfigError(format!("task '{name}': invalid delay '{s}': {e}"))
        })?,
        None => DEFAULT_DELAY,
    };

    Ok(TaskConfig {
        name: name.to_string(),
        root: resolve_path(base_dir, &dir),
        cwd: resolve_path(base_dir, &cwd),
        command,
        on_start: section.onstart.as_deref().and_then(CommandSpec::parse_line),
        pid_file: section
            .pidfile
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| resolve_path(base_dir, p)),
        match_pattern,
        ignore_pattern,
        recursive: inherited(&section.recursive, parent, |p| &p.recursive).unwrap_or(false),
        dotfiles: inherited(&section.dotfiles, parent, |p| &p.dotfiles).unwrap_or(false),
        after: inherited(&section.after, parent, |p| &p.after).unwrap_or(false),
        delay,
    })
}

fn resolve_command(name: &str, section: &RawSection) -> Result<CommandSpec> {
    let cmd = section
        .cmd
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| WwatchError::ConfigError(format!("task '{name}' has no `cmd`")))?;

    match &section.args {
        Some(args) => Ok(CommandSpec::new(cmd, args.clone())),
        None => CommandSpec::parse_line(cmd)
            .ok_or_else(|| WwatchError::ConfigError(format!("task '{name}' has no `cmd`"))),
    }
}

fn inherited<T: Clone>(
    own: &Option<T>,
    parent: Option<&RawSection>,
    get: impl Fn(&RawSection) -> &Option<T>,
) -> Option<T> {
    own.clone().or_else(|| parent.and_then(|p| get(p).clone()))
}

/// `ext` wins over `match` within one section.
fn own_match_source(section: &RawSection) -> Option<String> {
    if let Some(ext) = section.ext.as_deref() {
        if let Some(pattern) = ext_pattern(ext) {
            return Some(pattern);
        }
    }
    section.match_pattern.clone().filter(|m| !m.is_empty())
}

/// Turn `"less, js"` into `.*\.(less|js)$`.
pub fn ext_pattern(ext: &str) -> Option<String> {
    let exts: Vec<String> = ext
        .split(',')
        .map(|e| e.trim().trim_start_matches('.'))
        .filter(|e| !e.is_empty())
        .map(regex::escape)
        .collect();

    if exts.is_empty() {
        None
    } else {
        Some(format!(r".*\.({})$", exts.join("|")))
    }
}

/// Resolve `part` against `base`; absolute paths pass through.
///
/// `.` components are dropped so event paths read naturally
/// (`cfg/src/main.go`, not `cfg/./src/main.go`).
pub fn resolve_path(base: Option<&Path>, part: &str) -> PathBuf {
    let joined = match base {
        Some(base) if !Path::new(part).is_absolute() => base.join(part),
        _ => PathBuf::from(part),
    };

    let cleaned: PathBuf = joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}

/// Parse a duration string like `"100ms"`, `"1.5s"` or `"1m30s"`.
///
/// Accepts one or more `<number><unit>` segments with units `ns`, `us`/`µs`,
/// `ms`, `s`, `m` and `h`. A bare `"0"` is also accepted.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos = 0f64;
    let mut rest = s;

    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(format!("expected a number at '{rest}'"));
        }
        let (num_part, tail) = rest.split_at(num_len);
        let value: f64 = num_part
            .parse()
            .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);

        let nanos_per_unit = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            "" => return Err("duration missing unit suffix".to_string()),
            other => {
                return Err(format!(
                    "unsupported duration unit '{other}'; expected ns, us, ms, s, m, or h"
                ));
            }
        };

        total_nanos += value * nanos_per_unit;
        rest = next;
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}
