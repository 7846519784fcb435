//! State store implementations for AdPilot.
//!
//! Three backends share the [`StateStore`] trait from `adpilot-core`:
//!
//! - [`MemoryStore`]: in-process map with TTL eviction, the default. State
//!   does not survive a restart.
//! - [`SqliteStore`]: durable single-file store (feature `sqlite`, on by
//!   default). Suitable for single-node deployments that must survive
//!   restarts.
//! - [`NoopStore`]: discards everything. Useful for stateless tests and
//!   fire-and-forget runs.

use std::sync::Arc;

use adpilot_core::{StateStore, StoreError};

pub mod memory;
pub mod noop;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
pub use noop::NoopStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Build a store from a configured backend name.
///
/// Recognized backends: `memory`, `sqlite`, `none`. The `path` is only
/// consulted for sqlite.
pub async fn from_backend(backend: &str, path: &str) -> Result<Arc<dyn StateStore>, StoreError> {
    match backend {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(sqlite::SqliteStore::new(path).await?)),
        "none" => Ok(Arc::new(NoopStore)),
        other => Err(StoreError::Storage(format!(
            "unknown store backend '{other}' (expected memory, sqlite, or none)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_backend_builds_memory() {
        let store = from_backend("memory", "").await.unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[tokio::test]
    async fn from_backend_builds_noop() {
        let store = from_backend("none", "").await.unwrap();
        assert_eq!(store.name(), "none");
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn from_backend_builds_sqlite() {
        let store = from_backend("sqlite", "sqlite::memory:").await.unwrap();
        assert_eq!(store.name(), "sqlite");
    }

    #[tokio::test]
    async fn from_backend_rejects_unknown() {
        let err = from_backend("redis", "").await.unwrap_err();
        assert!(err.to_string().contains("unknown store backend"));
    }
}
