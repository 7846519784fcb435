//! Per-session advisory locks.
//!
//! Two concurrent requests for the same session would race the
//! load-mutate-save cycle, so the orchestrator admits one at a time and
//! rejects the rest with [`SessionError::Busy`]. Thread-safe via
//! `std::sync::Mutex` (non-async, held briefly); the returned guard is held
//! across the whole run and releases on drop.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use adpilot_core::SessionError;

/// Tracks which sessions currently have a request in flight.
#[derive(Clone, Default)]
pub(crate) struct SessionLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

impl SessionLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claim the session, or fail fast if another request holds it.
    pub(crate) fn acquire(&self, session_id: &str) -> Result<SessionGuard, SessionError> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(session_id.to_string()) {
            return Err(SessionError::Busy(session_id.to_string()));
        }
        Ok(SessionGuard {
            held: Arc::clone(&self.held),
            session_id: session_id.to_string(),
        })
    }
}

/// Releases the session claim on drop.
#[derive(Debug)]
pub(crate) struct SessionGuard {
    held: Arc<Mutex<HashSet<String>>>,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_busy() {
        let locks = SessionLocks::new();
        let guard = locks.acquire("sess-1").unwrap();
        let err = locks.acquire("sess-1").unwrap_err();
        assert!(matches!(err, SessionError::Busy(ref id) if id == "sess-1"));
        drop(guard);
    }

    #[test]
    fn different_sessions_do_not_contend() {
        let locks = SessionLocks::new();
        let _a = locks.acquire("sess-1").unwrap();
        assert!(locks.acquire("sess-2").is_ok());
    }

    #[test]
    fn drop_releases_the_session() {
        let locks = SessionLocks::new();
        drop(locks.acquire("sess-1").unwrap());
        assert!(locks.acquire("sess-1").is_ok());
    }
}
