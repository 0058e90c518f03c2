use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::StoreResult;
use crate::session::SessionData;

/// Expiring key/value storage for session records, keyed by session id.
///
/// Implementations must be safe to share across every in-flight call.
/// A missing or expired record reads as an empty mapping, never an error;
/// errors are reserved for backend failures.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the record for `session_id`, or an empty mapping if none is live.
    async fn get(&self, session_id: &str) -> StoreResult<SessionData>;

    /// Replace the record for `session_id`, expiring `ttl` from now. A zero
    /// `ttl` selects the store's default.
    async fn put(&self, session_id: &str, data: &SessionData, ttl: Duration) -> StoreResult<()>;

    /// Remove the record for `session_id`. Removing an absent record is not
    /// an error.
    async fn delete(&self, session_id: &str) -> StoreResult<()>;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get(&self, session_id: &str) -> StoreResult<SessionData> {
        (**self).get(session_id).await
    }

    async fn put(&self, session_id: &str, data: &SessionData, ttl: Duration) -> StoreResult<()> {
        (**self).put(session_id, data, ttl).await
    }

    async fn delete(&self, session_id: &str) -> StoreResult<()> {
        (**self).delete(session_id).await
    }
}
