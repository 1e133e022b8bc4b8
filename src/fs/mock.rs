// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(BTreeSet<String>), // child names
    /// Symlink pointing at a directory; listed but never descended into.
    DirLink,
    /// Directory whose listing fails.
    Unreadable,
}

/// In-memory filesystem for walk and PID-file tests.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.insert(path.as_ref(), MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.lock();
        ensure_dir(&mut entries, path);
    }

    pub fn add_dir_symlink(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::DirLink);
    }

    pub fn add_unreadable_dir(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::Unreadable);
    }

    fn insert(&self, path: &Path, entry: MockEntry) {
        let mut entries = self.lock();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(&mut entries, parent);
            link_child(&mut entries, parent, path);
        }
        entries.insert(path.to_path_buf(), entry);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        // A panic while holding the lock only happens in a failing test.
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn ensure_dir(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(BTreeSet::new()));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(entries, parent);
        link_child(entries, parent, path);
    }
}

fn link_child(entries: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let (Some(MockEntry::Dir(children)), Some(name)) =
        (entries.get_mut(parent), child.file_name().and_then(|n| n.to_str()))
    {
        children.insert(name.to_string());
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.lock().get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(_) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(
            self.lock().get(path),
            Some(MockEntry::Dir(_) | MockEntry::DirLink | MockEntry::Unreadable)
        )
    }

    fn is_symlink(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::DirLink))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            Some(MockEntry::Unreadable) => Err(anyhow!("Permission denied: {:?}", path)),
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
