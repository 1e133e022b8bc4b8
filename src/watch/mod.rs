// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Discovering which directories of a task's tree get a watch handle.
//! - Wiring those handles up to a cross-platform watcher (`notify`) and
//!   forwarding raw notifications as `WatchEvent`s.
//! - The trigger filter deciding whether a change may restart the task.
//!
//! It does **not** debounce or restart anything; that happens in
//! [`crate::engine`].

pub mod event;
pub mod filter;
pub mod path_utils;
pub mod walk;
pub mod watcher;

pub use event::{WatchEvent, WatchEventKind};
pub use filter::{FilterVerdict, TriggerFilter};
pub use walk::{collect_watch_dirs, WalkOptions};
pub use watcher::WatchSet;
