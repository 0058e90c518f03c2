//! # USSD Core
//!
//! Session lifecycle and screen routing for menu-driven USSD dialogs.
//!
//! Every network round-trip reaches the service as an independent request
//! carrying the caller's accumulated input (`1*200*3`). This crate rebuilds
//! where in the conversation the caller is and decides what to show next:
//!
//! - [`session_store`]: expiring, concurrency-safe session records
//! - [`routing`]: screen paths mapped to display and input handlers
//! - [`interceptors`]: ordered cross-cutting wrappers around handlers
//! - [`engine`]: the per-call state machine tying them together
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rvoip_ussd_core::prelude::*;
//!
//! let mut router = Router::new("/home");
//! router.intercept(Recover::new());
//! router.display("/home", |_| Reply::con("1) Balance\n2) Exit"));
//! router.input("/home", |ctx| match ctx.input() {
//!     "1" => { ctx.redirect("/balance"); Reply::con("") }
//!     _ => Reply::end("Bye"),
//! });
//! router.display("/balance", |_| Reply::end("Balance: 10.00"));
//!
//! let store = Arc::new(MemoryStore::new(StoreConfig::default()));
//! let engine = Engine::new(router.build(), store, EngineConfig::default());
//! let reply = engine.handle(Request::new("sess-1", "258840000000", "")).await?;
//! ```

pub mod errors;
pub mod types;
pub mod session;
pub mod session_store;
pub mod routing;
pub mod interceptors;
pub mod engine;
pub mod testkit;

pub use engine::{Context, Engine, EngineConfig, StatsSnapshot};
pub use errors::{EngineError, StoreError};
pub use routing::{handler, Handler, Router, RouteTable};
pub use session::{Session, SessionData, Value};
pub use session_store::{MemoryStore, SessionStore, StoreConfig};
pub use types::{HandlerKind, Reply, Request};

pub mod prelude {
    pub use crate::engine::{Context, Engine, EngineConfig};
    pub use crate::errors::{EngineError, StoreError};
    pub use crate::interceptors::{shared, HmacAuth, Interceptor, Logging, RateLimit, Recover, SharedInterceptor};
    pub use crate::routing::{handler, Handler, Router};
    pub use crate::session::{Session, Value};
    pub use crate::session_store::{MemoryStore, SessionStore, StoreConfig};
    pub use crate::types::{Reply, Request};
}
