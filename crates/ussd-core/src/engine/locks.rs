//! Optional per-session serialization

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per session id with a call in flight.
#[derive(Debug, Default)]
pub(crate) struct SessionLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait until no other call holds `session_id`.
    pub(crate) async fn acquire(&self, session_id: &str) -> SessionGuard<'_> {
        let lock = self
            .locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        SessionGuard {
            locks: self,
            session_id: session_id.to_string(),
            guard: Some(guard),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Releases the session on drop and forgets its mutex once nobody waits.
pub(crate) struct SessionGuard<'a> {
    locks: &'a SessionLocks,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .locks
            .remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
