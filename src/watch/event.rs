// src/watch/event.rs

use std::path::PathBuf;

use notify::event::{EventKind, ModifyKind};

/// Kind of a filesystem change, as far as the supervisor cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Create,
    Delete,
    Rename,
    Modify,
    Other,
}

impl WatchEventKind {
    /// Map a `notify` event kind.
    ///
    /// Pure access notifications (open/read/close) return `None`: a running
    /// command reading its own sources must not restart itself.
    pub fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Create),
            EventKind::Remove(_) => Some(Self::Delete),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Rename),
            EventKind::Modify(_) => Some(Self::Modify),
            EventKind::Access(_) => None,
            EventKind::Any | EventKind::Other => Some(Self::Other),
        }
    }

    /// Create/delete/rename change the set of directories that need a watch.
    pub fn is_structural(self) -> bool {
        matches!(self, Self::Create | Self::Delete | Self::Rename)
    }
}

/// One change to one path, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchEventKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: WatchEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Split a `notify` event into one `WatchEvent` per affected path.
    pub fn from_notify(event: notify::Event) -> Vec<Self> {
        let Some(kind) = WatchEventKind::from_notify(&event.kind) else {
            return Vec::new();
        };
        event
            .paths
            .into_iter()
            .map(|path| Self { path, kind })
            .collect()
    }
}
