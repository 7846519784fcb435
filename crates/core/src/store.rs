//! StateStore trait — durable, TTL-bounded persistence for agent state.
//!
//! Every suspension point in the agent loop writes the full serialized
//! [`AgentState`](crate::state::AgentState) under a session-scoped key so
//! a later process (or the same one, after a pause for user input) can
//! pick the run back up exactly where it left off.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreError;

/// Key under which a session's agent state is stored.
pub fn state_key(session_id: &str) -> String {
    format!("agent:state:{session_id}")
}

/// Key under which a session's conversation history is stored.
pub fn history_key(session_id: &str) -> String {
    format!("agent:history:{session_id}")
}

/// The core StateStore trait.
///
/// Implementations: in-memory (default, for tests and single-process
/// deployments), SQLite (durable across restarts), none (no-op).
#[async_trait]
pub trait StateStore: Send + Sync {
    /// The backend name (e.g., "memory", "sqlite", "none").
    fn name(&self) -> &str;

    /// Fetch the value stored under `key`, if present and not expired.
    async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, StoreError>;

    /// Store `value` under `key`, replacing any previous value and
    /// resetting its time-to-live.
    async fn put(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> std::result::Result<(), StoreError>;

    /// Remove the value stored under `key`. Returns whether a value
    /// was present.
    async fn delete(&self, key: &str) -> std::result::Result<bool, StoreError>;
}

impl std::fmt::Debug for dyn StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("name", &self.name())
            .finish()
    }
}
