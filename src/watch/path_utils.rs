// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::Path;

/// Render a path for pattern matching, with forward slashes.
pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// True if the final component of `path` starts with a dot.
///
/// Paths ending in `.` or `..` have no file name and are never dot-files, so
/// a root of `.` is not hidden from itself.
pub fn is_dotfile(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
