#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use wwatch::config::TaskConfig;
use wwatch::exec::CommandSpec;

/// Builder for a resolved `TaskConfig`, bypassing TOML parsing.
///
/// Defaults mirror the configuration defaults, except for the delay, which is
/// kept short so tests run fast.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(name: &str, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            task: TaskConfig {
                name: name.to_string(),
                cwd: root.clone(),
                root,
                command: CommandSpec::new("true", Vec::new()),
                on_start: None,
                pid_file: None,
                match_pattern: Regex::new(".*").expect("valid regex"),
                ignore_pattern: None,
                recursive: false,
                dotfiles: false,
                after: false,
                delay: Duration::from_millis(50),
            },
        }
    }

    pub fn cmd(mut self, line: &str) -> Self {
        self.task.command = CommandSpec::parse_line(line).expect("non-empty command");
        self
    }

    pub fn on_start(mut self, line: &str) -> Self {
        self.task.on_start = CommandSpec::parse_line(line);
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.task.cwd = cwd.into();
        self
    }

    pub fn match_pattern(mut self, pattern: &str) -> Self {
        self.task.match_pattern = Regex::new(pattern).expect("valid match regex");
        self
    }

    pub fn ignore(mut self, pattern: &str) -> Self {
        self.task.ignore_pattern = Some(Regex::new(pattern).expect("valid ignore regex"));
        self
    }

    pub fn pid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.task.pid_file = Some(path.into());
        self
    }

    pub fn recursive(mut self, val: bool) -> Self {
        self.task.recursive = val;
        self
    }

    pub fn dotfiles(mut self, val: bool) -> Self {
        self.task.dotfiles = val;
        self
    }

    pub fn after(mut self, val: bool) -> Self {
        self.task.after = val;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.task.delay = delay;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
