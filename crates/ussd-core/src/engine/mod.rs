//! Dispatch engine
//!
//! Each call runs one step of the screen state machine:
//!
//! 1. Load the session (empty when absent, expired or unreadable).
//! 2. No current path recorded: enter the start screen and show it.
//! 3. Otherwise take the input token from the accumulated text. An empty
//!    token re-shows the current screen.
//! 4. Run the current screen's input handler. A terminating reply ends the
//!    session. Otherwise, if the handler redirected, move to the target and
//!    show it; if not, re-show the current screen.
//! 5. Persist the session with a fresh TTL, or delete it if the reply
//!    terminates the conversation.
//!
//! Storage failures never fail the call: they are counted in
//! [`EngineStats`] and logged. Calls for different sessions run fully in
//! parallel; calls for the same session are only serialized when
//! [`EngineConfig::serialize_sessions`] is set.

pub mod config;
pub mod context;
pub mod stats;
mod locks;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::errors::{EngineError, Result};
use crate::interceptors::recover::panic_message;
use crate::routing::RouteTable;
use crate::session::{Session, SessionData};
use crate::session_store::SessionStore;
use crate::types::{HandlerKind, Reply, Request};

pub use config::EngineConfig;
pub use context::Context;
pub use stats::{EngineStats, StatsSnapshot};

use locks::SessionLocks;

/// Session key holding the screen the caller is on.
pub const CURRENT_PATH_KEY: &str = "__ussd.path";
/// Session key holding a redirect requested by an input handler, until the
/// engine acts on it within the same call.
pub const REDIRECT_KEY: &str = "__ussd.next";

/// Drives sessions through the route table.
pub struct Engine {
    table: Arc<RouteTable>,
    store: Arc<dyn SessionStore>,
    config: EngineConfig,
    stats: EngineStats,
    locks: Option<SessionLocks>,
}

impl Engine {
    pub fn new(table: RouteTable, store: Arc<dyn SessionStore>, config: EngineConfig) -> Self {
        let locks = config.serialize_sessions.then(SessionLocks::new);
        Self {
            table: Arc::new(table),
            store,
            config,
            stats: EngineStats::default(),
            locks,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Process one step of a session.
    pub async fn handle(&self, request: Request) -> Result<Reply> {
        self.handle_with_cancel(request, &CancellationToken::new()).await
    }

    /// Process one step, giving up early if `cancel` fires before the
    /// handlers run. Once a handler has run the outcome is always persisted.
    ///
    /// On error the caller should still send [`EngineError::reply`].
    pub async fn handle_with_cancel(&self, request: Request, cancel: &CancellationToken) -> Result<Reply> {
        if request.session_id.trim().is_empty() {
            warn!(msisdn = %request.msisdn, "Rejected request without session id");
            return Err(EngineError::MissingSessionId);
        }
        EngineStats::bump(&self.stats.calls);
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let session_id = request.session_id.clone();
        let _guard = match &self.locks {
            Some(locks) => Some(locks.acquire(&session_id).await),
            None => None,
        };

        let data = self.load(&session_id).await;
        if cancel.is_cancelled() {
            debug!(session_id = %session_id, "Call cancelled before dispatch");
            return Err(EngineError::Cancelled);
        }

        let request = Arc::new(request);
        let session = Session::with_data(session_id, data);
        let (session, reply) = self.dispatch(session, &request, cancel);
        self.persist(session, &reply).await;
        Ok(reply)
    }

    async fn load(&self, session_id: &str) -> SessionData {
        match self.store.get(session_id).await {
            Ok(data) => data,
            Err(e) => {
                EngineStats::bump(&self.stats.store_read_failures);
                warn!(session_id = %session_id, error = %e, "Session read failed, starting fresh");
                SessionData::new()
            }
        }
    }

    async fn persist(&self, session: Session, reply: &Reply) {
        let session_id = session.id().to_string();
        if reply.is_terminating() {
            if let Err(e) = self.store.delete(&session_id).await {
                EngineStats::bump(&self.stats.store_delete_failures);
                warn!(session_id = %session_id, error = %e, "Session delete failed");
            }
            debug!(session_id = %session_id, "Session ended");
        } else if let Err(e) = self.store.put(&session_id, session.data(), self.config.session_ttl).await {
            EngineStats::bump(&self.stats.store_write_failures);
            warn!(session_id = %session_id, error = %e, "Session write failed");
        }
    }

    fn dispatch(&self, mut session: Session, request: &Arc<Request>, cancel: &CancellationToken) -> (Session, Reply) {
        let current = session.get_str(CURRENT_PATH_KEY).to_string();
        if current.is_empty() {
            let start = self.table.start_path().to_string();
            debug!(session_id = %session.id(), path = %start, "New session entering start screen");
            session.set(CURRENT_PATH_KEY, start.clone());
            return self.show(session, request, &start, cancel);
        }

        let token = request.input_token();
        if token.is_empty() {
            return self.show(session, request, &current, cancel);
        }

        let (mut session, reply, redirect) =
            self.invoke(session, request, &current, HandlerKind::Input, token, cancel);
        if let Some(target) = redirect.filter(|target| !target.is_empty()) {
            session.set(REDIRECT_KEY, target);
        }
        if reply.is_terminating() {
            return (session, reply);
        }

        let next = session
            .remove(REDIRECT_KEY)
            .map(|value| value.as_str().to_string())
            .unwrap_or_default();
        if next.is_empty() {
            return self.show(session, request, &current, cancel);
        }

        debug!(session_id = %session.id(), from = %current, to = %next, "Redirecting");
        session.set(CURRENT_PATH_KEY, next.clone());
        self.show(session, request, &next, cancel)
    }

    fn show(&self, session: Session, request: &Arc<Request>, path: &str, cancel: &CancellationToken) -> (Session, Reply) {
        let (session, reply, _) = self.invoke(session, request, path, HandlerKind::Display, "", cancel);
        (session, reply)
    }

    fn invoke(
        &self,
        session: Session,
        request: &Arc<Request>,
        path: &str,
        kind: HandlerKind,
        input: &str,
        cancel: &CancellationToken,
    ) -> (Session, Reply, Option<String>) {
        let Some(route) = self.table.resolve(path, kind) else {
            EngineStats::bump(&self.stats.route_misses);
            warn!(session_id = %session.id(), path = %path, kind = %kind, "No screen handler registered");
            return (session, self.unavailable(), None);
        };

        let mut ctx = Context::new(session, request.clone(), path, input, route.params, cancel.clone());
        let outcome = catch_unwind(AssertUnwindSafe(|| (route.handler)(&mut ctx)));
        let (session, redirect) = ctx.into_parts();

        match outcome {
            Ok(reply) => (session, reply, redirect),
            Err(payload) => {
                EngineStats::bump(&self.stats.handler_faults);
                error!(
                    session_id = %session.id(),
                    path = %path,
                    kind = %kind,
                    panic = %panic_message(payload.as_ref()),
                    "Screen handler fault escaped the interceptor chain"
                );
                (session, self.unavailable(), None)
            }
        }
    }

    fn unavailable(&self) -> Reply {
        Reply::end(self.config.unavailable_message.clone())
    }

    #[cfg(test)]
    pub(crate) fn locked_sessions(&self) -> usize {
        self.locks.as_ref().map(SessionLocks::len).unwrap_or(0)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("routes", &self.table)
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
