// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::engine::TaskName;
use crate::exec::CommandSpec;

/// Top-level configuration as read from a TOML file.
///
/// Either the main section carries a `cmd` (one task named `default`), or
/// tasks are declared as `[run.<name>]` tables that inherit from the main
/// section:
///
/// ```toml
/// dir = "src"
/// recursive = true
/// delay = "200ms"
///
/// [run.server]
/// cmd = "go"
/// args = ["run", "main.go"]
/// ext = "go"
///
/// [run.styles]
/// dir = "assets"
/// cmd = "make css"
/// match = '.*\.less$'
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Keys that live at the top level of the file.
    #[serde(flatten)]
    pub main: RawSection,

    /// Named tasks from `[run.<name>]`.
    #[serde(default)]
    pub run: BTreeMap<String, RawSection>,

    /// Directory relative paths are resolved against.
    ///
    /// Set by the loader to the config file's directory; `None` keeps paths
    /// relative to the process working directory.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// One section (main or `[run.<name>]`) exactly as written.
///
/// Every key is optional so that "not set" and "set to the default" can be
/// told apart during inheritance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSection {
    /// Directory to watch.
    #[serde(default)]
    pub dir: Option<String>,

    /// Working directory of the command.
    #[serde(default)]
    pub cwd: Option<String>,

    /// Program to run. Split on whitespace when `args` is absent.
    #[serde(default)]
    pub cmd: Option<String>,

    #[serde(default)]
    pub args: Option<Vec<String>>,

    /// Command line run once before the first start.
    #[serde(default)]
    pub onstart: Option<String>,

    #[serde(default)]
    pub pidfile: Option<String>,

    #[serde(default, rename = "match")]
    pub match_pattern: Option<String>,

    /// Comma separated extension list; replaces `match`.
    #[serde(default)]
    pub ext: Option<String>,

    #[serde(default)]
    pub ignore: Option<String>,

    /// Duration string such as `"100ms"` or `"1m30s"`.
    #[serde(default)]
    pub delay: Option<String>,

    #[serde(default)]
    pub recursive: Option<bool>,

    #[serde(default)]
    pub dotfiles: Option<bool>,

    /// Defer the first start until the first qualifying change.
    #[serde(default)]
    pub after: Option<bool>,
}

/// Fully resolved settings of one task.
///
/// Every value is final: defaults are applied and inheritance is flattened,
/// so a `Task` never looks anything up elsewhere.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub name: TaskName,
    /// Root of the watched tree.
    pub root: PathBuf,
    /// Working directory of the command and the on-start command.
    pub cwd: PathBuf,
    pub command: CommandSpec,
    pub on_start: Option<CommandSpec>,
    pub pid_file: Option<PathBuf>,
    pub match_pattern: Regex,
    pub ignore_pattern: Option<Regex>,
    pub recursive: bool,
    /// Whether dot-files and dot-directories are visible.
    pub dotfiles: bool,
    /// Defer the first start until the first qualifying change.
    pub after: bool,
    pub delay: Duration,
}

/// Validated configuration: the set of tasks handed to the supervisor.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    on_start: Option<CommandSpec>,
    cwd: PathBuf,
    tasks: Vec<TaskConfig>,
}

impl ConfigFile {
    /// Build a `ConfigFile` without re-running validation.
    ///
    /// Used by `TryFrom<RawConfigFile>` once validation has passed.
    pub(crate) fn new_unchecked(
        on_start: Option<CommandSpec>,
        cwd: PathBuf,
        tasks: Vec<TaskConfig>,
    ) -> Self {
        Self {
            on_start,
            cwd,
            tasks,
        }
    }

    /// Global on-start command, run once before any task starts.
    ///
    /// Only present when the main section declares `onstart` alongside
    /// `[run.*]` tables; a single-task config attaches it to the task instead.
    pub fn on_start(&self) -> Option<&CommandSpec> {
        self.on_start.as_ref()
    }

    /// Working directory for the global on-start command.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn tasks(&self) -> &[TaskConfig] {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn into_tasks(self) -> Vec<TaskConfig> {
        self.tasks
    }
}
