//! Persistent client-side key-value storage
//!
//! Holds the small amount of state that must survive a restart: the id of
//! the active chat session and the session-list display preference.

pub mod file;

pub use file::FileStore;

use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Key holding the active session id
pub const CURRENT_SESSION_KEY: &str = "currentSessionId";

/// Key holding the collapsed session-list preference
pub const SIDEBAR_COLLAPSED_KEY: &str = "sidebarCollapsed";

/// String key-value store that outlives the process
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> crate::Result<()>;
    fn remove(&self, key: &str) -> crate::Result<()>;
}

/// Volatile store, for tests and one-off runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> crate::Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> crate::Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Typed view over the UI preference entries
pub struct Preferences<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> Preferences<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    pub fn sidebar_collapsed(&self) -> bool {
        self.store.get(SIDEBAR_COLLAPSED_KEY).as_deref() == Some("true")
    }

    pub fn set_sidebar_collapsed(&self, collapsed: bool) -> crate::Result<()> {
        self.store
            .set(SIDEBAR_COLLAPSED_KEY, if collapsed { "true" } else { "false" })
    }

    /// Flip the preference and return the new value
    pub fn toggle_sidebar(&self) -> crate::Result<bool> {
        let collapsed = !self.sidebar_collapsed();
        self.set_sidebar_collapsed(collapsed)?;
        Ok(collapsed)
    }
}

/// Forget everything stored for the signed-in user (logout, expiry)
pub fn clear_client_state(store: &dyn KeyValueStore) -> crate::Result<()> {
    store.remove(CURRENT_SESSION_KEY)?;
    store.remove(SIDEBAR_COLLAPSED_KEY)?;
    Ok(())
}
