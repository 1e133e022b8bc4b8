// src/watch/walk.rs

//! Discovery of the directories that get a watch handle.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use crate::errors::{Result, WwatchError};
use crate::fs::FileSystem;
use crate::watch::path_utils::{is_dotfile, path_str};

/// Walk settings taken from a task's configuration.
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions<'a> {
    pub recursive: bool,
    pub dotfiles: bool,
    pub ignore: Option<&'a Regex>,
}

/// Collect every directory under `root` that should be watched.
///
/// - Non-recursive: just `root`.
/// - Recursive: `root` plus every real (non-symlink) descendant directory,
///   skipping dot-directories when dot-files are hidden and anything whose
///   path matches the ignore pattern. A skipped directory hides its whole
///   subtree.
///
/// The root itself is always included. Failing to list the root is fatal;
/// failing to list a subdirectory only drops that subtree.
pub fn collect_watch_dirs(
    fs: &dyn FileSystem,
    root: &Path,
    opts: WalkOptions<'_>,
) -> Result<Vec<PathBuf>> {
    if !fs.is_dir(root) {
        return Err(WwatchError::WatchRoot {
            path: root.to_path_buf(),
            reason: "not an existing directory".to_string(),
        });
    }

    if !opts.recursive {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut dirs = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if dir == root => {
                return Err(WwatchError::WatchRoot {
                    path: dir,
                    reason: format!("{err:#}"),
                });
            }
            Err(err) => {
                warn!(dir = ?dir, error = %err, "cannot list directory; its subtree is not watched");
                continue;
            }
        };

        dirs.push(dir);

        for path in entries {
            if fs.is_symlink(&path) || !fs.is_dir(&path) {
                continue;
            }
            if !opts.dotfiles && is_dotfile(&path) {
                debug!(dir = ?path, "skipping dot-directory");
                continue;
            }
            if opts.ignore.is_some_and(|rx| rx.is_match(&path_str(&path))) {
                debug!(dir = ?path, "skipping ignored directory");
                continue;
            }
            stack.push(path);
        }
    }

    dirs.sort();
    Ok(dirs)
}
