// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::config::resolve::{resolve_path, resolve_task, DEFAULT_CWD, DEFAULT_TASK_NAME};
use crate::errors::{Result, WwatchError};
use crate::exec::CommandSpec;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let base_dir = raw.base_dir.as_deref();

        if raw.run.is_empty() {
            // Single task from the main section; it owns `onstart` itself.
            let task = resolve_task(DEFAULT_TASK_NAME, &raw.main, None, base_dir)?;
            let cwd = task.cwd.clone();
            return Ok(ConfigFile::new_unchecked(None, cwd, vec![task]));
        }

        let mut tasks = Vec::with_capacity(raw.run.len());
        for (name, section) in raw.run.iter() {
            tasks.push(resolve_task(name, section, Some(&raw.main), base_dir)?);
        }

        let on_start = raw.main.onstart.as_deref().and_then(CommandSpec::parse_line);
        let cwd = resolve_path(base_dir, raw.main.cwd.as_deref().unwrap_or(DEFAULT_CWD));

        Ok(ConfigFile::new_unchecked(on_start, cwd, tasks))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    ensure_single_source(cfg)?;
    validate_task_names(cfg)?;
    Ok(())
}

fn has_main_cmd(cfg: &RawConfigFile) -> bool {
    cfg.main
        .cmd
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if !has_main_cmd(cfg) && cfg.run.is_empty() {
        return Err(WwatchError::ConfigError(
            "no task found: specify `cmd` or at least one [run.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn ensure_single_source(cfg: &RawConfigFile) -> Result<()> {
    if has_main_cmd(cfg) && !cfg.run.is_empty() {
        return Err(WwatchError::ConfigError(
            "`cmd` in the main section and [run.<name>] sections can't be used together"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_task_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.run.keys() {
        if name.trim().is_empty() {
            return Err(WwatchError::ConfigError(
                "[run.<name>] sections need a non-empty name".to_string(),
            ));
        }
    }
    Ok(())
}
