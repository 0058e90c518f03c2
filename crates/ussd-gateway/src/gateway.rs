use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use rvoip_ussd_core::Engine;

use crate::adapters::{form, json, AdapterState, FormAdapter, JsonAdapter};

/// Mounts aggregator adapters on HTTP paths in front of one engine.
///
/// ```ignore
/// let app = GatewayBuilder::new(engine)
///     .form("/ussd/at", FormAdapter::africastalking())
///     .json("/ussd/vodacom", JsonAdapter::vodacom())
///     .build();
/// ```
pub struct GatewayBuilder {
    engine: Arc<Engine>,
    cancel: CancellationToken,
    router: Router,
}

impl GatewayBuilder {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            cancel: CancellationToken::new(),
            router: Router::new(),
        }
    }

    /// Calls arriving after `token` fires are answered with the cancelled
    /// reply instead of reaching the screens.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Serve a form adapter on `path` for both POST bodies and GET queries.
    pub fn form(mut self, path: &str, adapter: FormAdapter) -> Self {
        info!(path = %path, vendor = %adapter.vendor(), "Mounting form adapter");
        let state = AdapterState::new(self.engine.clone(), adapter, self.cancel.clone());
        self.router = self
            .router
            .route(path, get(form::handle).post(form::handle).with_state(state));
        self
    }

    /// Serve a JSON adapter on `path` (POST only).
    pub fn json(mut self, path: &str, adapter: JsonAdapter) -> Self {
        info!(path = %path, vendor = %adapter.vendor(), "Mounting JSON adapter");
        let state = AdapterState::new(self.engine.clone(), adapter, self.cancel.clone());
        self.router = self.router.route(path, post(json::handle).with_state(state));
        self
    }

    pub fn build(self) -> Router {
        self.router.layer(TraceLayer::new_for_http())
    }
}
