//! Boundary types exchanged with transport adapters
//!
//! A [`Request`] is the normalized form of one network round-trip and a
//! [`Reply`] is the only thing a dispatch call produces. Both are immutable
//! once built.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Delimiter networks use between successive inputs in the accumulated text.
pub const INPUT_DELIMITER: char = '*';

/// Normalized inbound request for one step of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Opaque conversation id supplied by the network
    pub session_id: String,
    /// Caller identifier (phone number)
    pub msisdn: String,
    /// Dialled service code, when the vendor sends one
    pub service_code: Option<String>,
    /// Raw accumulated input, e.g. `1*200*3`
    pub text: String,
    /// Vendor-specific metadata, passed through to handlers untouched
    pub meta: HashMap<String, String>,
}

impl Request {
    pub fn new(session_id: impl Into<String>, msisdn: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            msisdn: msisdn.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_service_code(mut self, code: impl Into<String>) -> Self {
        self.service_code = Some(code.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Look up a metadata value.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    /// The input token for this call: the last `*`-delimited segment of the
    /// accumulated text, trimmed. Empty when the text is empty or ends with
    /// a delimiter.
    pub fn input_token(&self) -> &str {
        input_token(&self.text)
    }
}

/// Extract the input token from accumulated text.
pub fn input_token(text: &str) -> &str {
    text.trim()
        .rsplit(INPUT_DELIMITER)
        .next()
        .unwrap_or("")
        .trim()
}

/// Outcome of one dispatch call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// `true` keeps the conversation open, `false` ends it
    #[serde(rename = "continue")]
    pub continue_session: bool,
    pub message: String,
}

impl Reply {
    /// A reply that keeps the session open (`CON`).
    pub fn con(message: impl Into<String>) -> Self {
        Self {
            continue_session: true,
            message: message.into(),
        }
    }

    /// A reply that terminates the session (`END`).
    pub fn end(message: impl Into<String>) -> Self {
        Self {
            continue_session: false,
            message: message.into(),
        }
    }

    pub fn is_terminating(&self) -> bool {
        !self.continue_session
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.continue_session { "CON" } else { "END" };
        write!(f, "{} {}", kind, self.message)
    }
}

/// Which of a route's two handlers is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// Produces the prompt when a screen is entered
    Display,
    /// Consumes one input token for the current screen
    Input,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Display => write!(f, "display"),
            HandlerKind::Input => write!(f, "input"),
        }
    }
}
