use std::time::Duration;

use crate::interceptors::recover::UNAVAILABLE_MESSAGE;

/// Configuration for the dispatch [`super::Engine`]
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// TTL given to a session each time it is persisted
    pub session_ttl: Duration,
    /// Terminating message for route misses and contained faults
    pub unavailable_message: String,
    /// Serialize concurrent calls that share a session id
    pub serialize_sessions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(60),
            unavailable_message: UNAVAILABLE_MESSAGE.to_string(),
            serialize_sessions: false,
        }
    }
}

impl EngineConfig {
    /// A zero TTL falls back to the default of 60 seconds.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = if ttl.is_zero() { Duration::from_secs(60) } else { ttl };
        self
    }

    pub fn with_unavailable_message(mut self, message: impl Into<String>) -> Self {
        self.unavailable_message = message.into();
        self
    }

    pub fn with_session_serialization(mut self, enabled: bool) -> Self {
        self.serialize_sessions = enabled;
        self
    }
}
