use std::time::Instant;

use tracing::info;

use super::Interceptor;
use crate::routing::{handler, Handler};

/// Emits one structured event per handler call with the caller, screen,
/// input, outcome and latency.
#[derive(Debug, Clone, Default)]
pub struct Logging;

impl Logging {
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for Logging {
    fn wrap(&self, next: Handler) -> Handler {
        handler(move |ctx| {
            let started = Instant::now();
            let reply = next(ctx);
            info!(
                session_id = %ctx.session().id(),
                msisdn = %ctx.request().msisdn,
                path = %ctx.path(),
                input = ?ctx.input(),
                continue_session = reply.continue_session,
                latency_ms = started.elapsed().as_millis() as u64,
                "USSD step"
            );
            reply
        })
    }
}
