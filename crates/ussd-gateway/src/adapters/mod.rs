//! Aggregator adapters
//!
//! Each adapter translates one vendor's HTTP callback into a [`Request`],
//! runs it through the engine and renders the [`Reply`] in the shape the
//! vendor expects. Adapters attach `vendor` and `ip` meta entries.

pub mod form;
pub mod json;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use rvoip_ussd_core::{Engine, Reply, Request};

pub use form::{FormAdapter, FormFields};
pub use json::{JsonAdapter, JsonFields, JsonReplyShape};

pub const VENDOR_META_KEY: &str = "vendor";
pub const IP_META_KEY: &str = "ip";

/// Per-route state handed to adapter handlers.
#[derive(Clone)]
pub(crate) struct AdapterState<A> {
    pub(crate) engine: Arc<Engine>,
    pub(crate) adapter: Arc<A>,
    pub(crate) cancel: CancellationToken,
}

impl<A> AdapterState<A> {
    pub(crate) fn new(engine: Arc<Engine>, adapter: A, cancel: CancellationToken) -> Self {
        Self {
            engine,
            adapter: Arc::new(adapter),
            cancel,
        }
    }

    /// Run one call; engine rejections become their terminating reply.
    pub(crate) async fn dispatch(&self, request: Request) -> Reply {
        let msisdn = request.msisdn.clone();
        match self.engine.handle_with_cancel(request, &self.cancel).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(msisdn = %msisdn, error = %e, "Call rejected by engine");
                e.reply()
            }
        }
    }
}

pub(crate) fn peer_ip(connect: Option<ConnectInfo<SocketAddr>>) -> String {
    connect
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

pub(crate) fn tag(request: Request, vendor: &str, ip: String) -> Request {
    request.with_meta(VENDOR_META_KEY, vendor).with_meta(IP_META_KEY, ip)
}
