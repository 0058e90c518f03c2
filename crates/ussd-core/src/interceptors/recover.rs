use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use super::Interceptor;
use crate::routing::{handler, Handler};
use crate::types::Reply;

/// Default reply used when a handler faults.
pub const UNAVAILABLE_MESSAGE: &str = "Service unavailable.";

/// Converts a panicking handler into a terminating reply.
///
/// Register it first so it is the outermost interceptor and also contains
/// faults raised by the interceptors inside it.
#[derive(Debug, Clone)]
pub struct Recover {
    message: String,
}

impl Recover {
    pub fn new() -> Self {
        Self {
            message: UNAVAILABLE_MESSAGE.to_string(),
        }
    }

    /// Use a custom terminating message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for Recover {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for Recover {
    fn wrap(&self, next: Handler) -> Handler {
        let message = self.message.clone();
        handler(move |ctx| match catch_unwind(AssertUnwindSafe(|| next(ctx))) {
            Ok(reply) => reply,
            Err(payload) => {
                error!(
                    session_id = %ctx.session().id(),
                    path = %ctx.path(),
                    panic = %panic_message(payload.as_ref()),
                    "Screen handler panicked"
                );
                Reply::end(message.clone())
            }
        })
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
