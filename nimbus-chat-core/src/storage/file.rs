//! JSON file backed key-value store

use super::KeyValueStore;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Key-value store persisted as a flat JSON object
///
/// The whole file is rewritten on every change. Entries are cached in memory,
/// so reads never touch the disk after construction; the cache only changes
/// once the write has succeeded.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file is missing or unreadable
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = Self::read_entries(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(path: &Path) -> BTreeMap<String, String> {
        if !path.exists() {
            return BTreeMap::new();
        }
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read state file {:?}: {}", path, e);
                return BTreeMap::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Ignoring corrupt state file {:?}: {}", path, e);
                BTreeMap::new()
            }
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(entries)?;
        self.write_atomically(&content).map_err(|e| {
            crate::Error::Storage(format!("failed to write {:?}: {}", self.path, e))
        })
    }

    fn write_atomically(&self, content: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> crate::Result<()> {
        let mut entries = self.entries.lock();
        if entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> crate::Result<()> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }
}
