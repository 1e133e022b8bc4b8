// src/watch/filter.rs

//! The trigger filter: which changed paths may restart a task.

use std::fmt;
use std::path::Path;

use regex::Regex;

use crate::config::TaskConfig;
use crate::watch::path_utils::{is_dotfile, path_str};

/// Why a path was accepted or rejected, in rule order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Pass,
    /// Dot-file while dot-files are hidden.
    Dotfile,
    /// Matched the ignore pattern.
    Ignored,
    /// Did not match the match pattern.
    NotMatched,
}

/// Compiled match/ignore/dot-file rules of one task.
#[derive(Clone)]
pub struct TriggerFilter {
    match_pattern: Regex,
    ignore_pattern: Option<Regex>,
    dotfiles: bool,
}

impl fmt::Debug for TriggerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerFilter")
            .field("match", &self.match_pattern.as_str())
            .field("ignore", &self.ignore_pattern.as_ref().map(Regex::as_str))
            .field("dotfiles", &self.dotfiles)
            .finish()
    }
}

impl TriggerFilter {
    pub fn new(match_pattern: Regex, ignore_pattern: Option<Regex>, dotfiles: bool) -> Self {
        Self {
            match_pattern,
            ignore_pattern,
            dotfiles,
        }
    }

    pub fn from_config(cfg: &TaskConfig) -> Self {
        Self::new(
            cfg.match_pattern.clone(),
            cfg.ignore_pattern.clone(),
            cfg.dotfiles,
        )
    }

    /// Apply the rules in order: dot-file, ignore, match.
    pub fn verdict(&self, path: &Path) -> FilterVerdict {
        if !self.dotfiles && is_dotfile(path) {
            return FilterVerdict::Dotfile;
        }

        let s = path_str(path);
        if self.is_ignored_str(&s) {
            return FilterVerdict::Ignored;
        }
        if !self.match_pattern.is_match(&s) {
            return FilterVerdict::NotMatched;
        }
        FilterVerdict::Pass
    }

    pub fn accepts(&self, path: &Path) -> bool {
        self.verdict(path) == FilterVerdict::Pass
    }

    fn is_ignored_str(&self, s: &str) -> bool {
        self.ignore_pattern
            .as_ref()
            .is_some_and(|rx| rx.is_match(s))
    }
}
