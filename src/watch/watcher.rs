// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::{Result, WwatchError};
use crate::fs::FileSystem;
use crate::watch::event::WatchEvent;
use crate::watch::walk::{collect_watch_dirs, WalkOptions};

/// The active watch handles of one task.
///
/// Every watched directory is registered non-recursively, so the set of
/// handles is exactly the set of directories returned by the walk. The set is
/// never patched: on a structural change the owner closes it and opens a new
/// one.
///
/// Releasing the set (`close` or drop) detaches the event sender from the
/// watcher's callback and then unregisters every directory. notify does not
/// join its thread on drop, so a callback may still be running; it finds the
/// sender gone and forwards nothing. Once release returns, this set produces
/// no further events.
pub struct WatchSet {
    watcher: Option<RecommendedWatcher>,
    sink: EventSink,
    dirs: BTreeSet<PathBuf>,
}

/// Sender shared with the watcher callback; `None` once the set is released.
type EventSink = Arc<Mutex<Option<mpsc::UnboundedSender<WatchEvent>>>>;

impl std::fmt::Debug for WatchSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSet")
            .field("dirs", &self.dirs.len())
            .finish()
    }
}

impl WatchSet {
    /// Walk `root` and open one watch per discovered directory.
    ///
    /// Raw notifications are forwarded to `events_tx`, one `WatchEvent` per
    /// affected path. A directory whose watch can't be opened is logged and
    /// skipped together with its subtree; if nothing at all could be watched
    /// the task can't work and an error is returned.
    pub fn open(
        fs: &dyn FileSystem,
        root: &Path,
        opts: WalkOptions<'_>,
        events_tx: mpsc::UnboundedSender<WatchEvent>,
    ) -> Result<Self> {
        let candidates = collect_watch_dirs(fs, root, opts)?;

        let sink: EventSink = Arc::new(Mutex::new(Some(events_tx)));
        let callback_sink = Arc::clone(&sink);

        // Called synchronously on notify's own thread. The lock is held for
        // the whole batch so release can't interleave with a send.
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let guard = callback_sink.lock().unwrap_or_else(PoisonError::into_inner);
                    let Some(events_tx) = guard.as_ref() else {
                        return;
                    };
                    for ev in WatchEvent::from_notify(event) {
                        if events_tx.send(ev).is_err() {
                            // Receiver gone: the task is shutting down.
                            break;
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "file watch error");
                }
            },
            Config::default(),
        )?;

        let mut dirs = BTreeSet::new();
        let mut failed: Vec<PathBuf> = Vec::new();

        // Candidates are sorted, so ancestors are seen before descendants.
        for dir in candidates {
            if failed.iter().any(|f| dir.starts_with(f)) {
                continue;
            }
            match watcher.watch(&dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    debug!(dir = ?dir, "watch opened");
                    dirs.insert(dir);
                }
                Err(err) => {
                    warn!(dir = ?dir, error = %err, "cannot watch directory; skipping its subtree");
                    failed.push(dir);
                }
            }
        }

        if dirs.is_empty() {
            return Err(WwatchError::WatchRoot {
                path: root.to_path_buf(),
                reason: "no directory could be watched".to_string(),
            });
        }

        debug!(root = ?root, dirs = dirs.len(), "watching");

        Ok(Self {
            watcher: Some(watcher),
            sink,
            dirs,
        })
    }

    /// Directories currently holding a watch.
    pub fn dirs(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn is_watching(&self, dir: &Path) -> bool {
        self.dirs.contains(dir)
    }

    /// Close every handle and stop the underlying watcher.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let Some(mut watcher) = self.watcher.take() else {
            return;
        };
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        for dir in &self.dirs {
            if let Err(err) = watcher.unwatch(dir) {
                // Deleted directories lose their watch on their own.
                debug!(dir = ?dir, error = %err, "unwatch failed");
            }
        }
        drop(watcher);
        debug!(dirs = self.dirs.len(), "watch set closed");
    }
}

impl Drop for WatchSet {
    fn drop(&mut self) {
        self.release();
    }
}
