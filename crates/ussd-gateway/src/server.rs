//! Gateway server lifecycle

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use rvoip_ussd_core::MemoryStore;

use crate::error::{GatewayError, Result};

/// Serves a gateway [`Router`] until its shutdown token fires.
///
/// Shutdown is graceful: in-flight calls finish, then the session store's
/// sweeper is stopped.
pub struct GatewayServer {
    bind: SocketAddr,
    app: Router,
    store: Option<Arc<MemoryStore>>,
    shutdown: CancellationToken,
    local_addr: Option<SocketAddr>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl GatewayServer {
    pub fn new(bind: SocketAddr, app: Router) -> Self {
        Self {
            bind,
            app,
            store: None,
            shutdown: CancellationToken::new(),
            local_addr: None,
            handle: None,
        }
    }

    /// Stop this store's sweeper when the server stops.
    pub fn with_store(mut self, store: Arc<MemoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use an externally owned shutdown token, e.g. one shared with
    /// [`crate::GatewayBuilder::with_cancellation`].
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Address actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Bind the listener and start serving in the background.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(addr) = self.local_addr.filter(|_| self.is_running()) {
            warn!(addr = %addr, "Gateway already running");
            return Ok(addr);
        }

        let listener = TcpListener::bind(self.bind).await?;
        let addr = listener.local_addr()?;
        info!(addr = %addr, "USSD gateway listening");

        let app = self.app.clone();
        let shutdown = self.shutdown.clone();
        self.handle = Some(tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .map_err(GatewayError::Io)
        }));
        self.local_addr = Some(addr);
        Ok(addr)
    }

    /// Signal shutdown, wait for in-flight calls, then stop the sweeper.
    pub async fn stop(&mut self) -> Result<()> {
        self.shutdown.cancel();

        let mut outcome = Ok(());
        if let Some(handle) = self.handle.take() {
            outcome = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "Gateway task failed");
                    Err(GatewayError::Io(std::io::Error::other(e.to_string())))
                }
            };
        }

        if let Some(store) = &self.store {
            store.shutdown().await;
        }
        info!("USSD gateway stopped");
        outcome
    }

    /// Start, then serve until the shutdown token fires or Ctrl-C arrives.
    pub async fn run(mut self) -> Result<()> {
        self.start().await?;

        let shutdown = self.shutdown.clone();
        tokio::select! {
            _ = shutdown.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => info!("Ctrl-C received, shutting down"),
                    Err(e) => error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
                }
            }
        }

        self.stop().await
    }
}
