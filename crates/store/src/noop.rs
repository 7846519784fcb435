//! No-op store — disables state persistence entirely.
//!
//! Every run becomes fire-and-forget: pauses cannot be resumed because
//! nothing is ever written. Useful for stateless batch invocations.

use async_trait::async_trait;
use std::time::Duration;

use adpilot_core::error::StoreError;
use adpilot_core::store::StateStore;

/// A no-op state store that persists nothing.
pub struct NoopStore;

#[async_trait]
impl StateStore for NoopStore {
    fn name(&self) -> &str {
        "none"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), StoreError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        Ok(false)
    }
}
