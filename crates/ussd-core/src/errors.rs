//! Error types for the USSD core

use thiserror::Error;

use crate::types::Reply;

/// Failure reported by a session store backend.
///
/// The engine never propagates these past the call boundary; they are
/// counted and logged, and the call proceeds best-effort.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Session data could not be (de)serialized: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Failure signal returned alongside a terminating reply when a call is
/// rejected before any handler runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Missing session id")]
    MissingSessionId,

    #[error("Request cancelled before dispatch")]
    Cancelled,
}

impl EngineError {
    /// The terminating reply a transport should still send back to the caller.
    pub fn reply(&self) -> Reply {
        match self {
            EngineError::MissingSessionId => Reply::end("Invalid session"),
            EngineError::Cancelled => Reply::end("Request cancelled"),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
