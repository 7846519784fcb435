//! In-memory store — the default backend for tests and single-process
//! deployments.
//!
//! Entries expire lazily: an expired value is dropped the next time its
//! key is read. Deadlines use [`tokio::time::Instant`] so TTL behavior is
//! testable under tokio's paused clock.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use adpilot_core::error::StoreError;
use adpilot_core::store::StateStore;

/// An in-memory state store keyed by session. State vanishes on restart,
/// which is acceptable for local runs and tests.
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, (Vec<u8>, Instant)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, deadline)| *deadline > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, deadline)) if *deadline > now => return Ok(Some(value.clone())),
                Some(_) => {} // expired, fall through to remove
                None => return Ok(None),
            }
        }
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        let deadline = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.to_vec(), deadline));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_and_get() {
        let store = MemoryStore::new();
        store
            .put("agent:state:s1", b"payload", Duration::from_secs(60))
            .await
            .unwrap();

        let value = store.get("agent:state:s1").await.unwrap();
        assert_eq!(value.as_deref(), Some(b"payload".as_slice()));
    }

    #[tokio::test]
    async fn get_missing_key() {
        let store = MemoryStore::new();
        assert!(store.get("agent:state:nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_replaces_existing() {
        let store = MemoryStore::new();
        store
            .put("k", b"v1", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .put("k", b"v2", Duration::from_secs(60))
            .await
            .unwrap();

        let value = store.get("k").await.unwrap();
        assert_eq!(value.as_deref(), Some(b"v2".as_slice()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn delete_entry() {
        let store = MemoryStore::new();
        store
            .put("k", b"v", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(store.delete("k").await.unwrap());
        assert!(store.get("k").await.unwrap().is_none());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let store = MemoryStore::new();
        store
            .put("k", b"v", Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn put_resets_ttl() {
        let store = MemoryStore::new();
        store
            .put("k", b"v1", Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(50)).await;
        store
            .put("k", b"v2", Duration::from_secs(60))
            .await
            .unwrap();

        // Past the original deadline but within the refreshed one.
        tokio::time::advance(Duration::from_secs(30)).await;
        let value = store.get("k").await.unwrap();
        assert_eq!(value.as_deref(), Some(b"v2".as_slice()));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_removed_on_read() {
        let store = MemoryStore::new();
        store.put("k", b"v", Duration::from_secs(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.entries.read().await.is_empty());
    }

    #[tokio::test]
    async fn backend_name() {
        assert_eq!(MemoryStore::new().name(), "memory");
    }
}
