//! Tab-scoped session storage
//!
//! In-memory stand-in for the browser's per-tab session storage. Values live
//! as long as the owning engine (one tab); nothing touches disk.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use super::traits::SessionStorage;

type StorageData = Arc<Mutex<HashMap<String, String>>>;

/// In-memory [`SessionStorage`]
///
/// Clones share the same underlying map, so a test can keep a handle and
/// inspect what the engine wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStorage {
    entries: StorageData,
}

impl MemorySessionStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Write a value.
    pub fn set_value(&self, key: &str, value: &str) {
        trace!(key, "session storage write");
        self.entries.lock().insert(key.to_string(), value.to_string());
    }

    /// Remove a value if present.
    pub fn remove_value(&self, key: &str) {
        trace!(key, "session storage remove");
        self.entries.lock().remove(key);
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.get_value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.set_value(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), String> {
        self.remove_value(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_entries() {
        let storage = MemorySessionStorage::new();
        let handle = storage.clone();

        storage.set("authgate.access_token", "tok").await.unwrap();
        assert_eq!(handle.get_value("authgate.access_token").as_deref(), Some("tok"));
        assert_eq!(handle.len(), 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let storage = MemorySessionStorage::new();
        storage.remove("missing").await.unwrap();

        storage.set("k", "v").await.unwrap();
        storage.remove("k").await.unwrap();
        storage.remove("k").await.unwrap();
        assert!(storage.is_empty());
        assert_eq!(storage.get("k").await.unwrap(), None);
    }
}
