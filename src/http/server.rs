//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay handler on every path
//! - Wire up middleware (tracing, request timeout, request ID)
//! - Own the session tracker and the backend dialer
//! - Serve on a listener until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::websocket::relay_handler;
use crate::lifecycle::shutdown::triggered;
use crate::net::SessionTracker;
use crate::relay::{BackendDialer, RelaySettings};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dialer: Arc<BackendDialer>,
    pub settings: RelaySettings,
    pub sessions: SessionTracker,
}

/// HTTP front of the proxy: accepts upgrades and answers everything else.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    sessions: SessionTracker,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let settings = RelaySettings::from(&config.relay);
        let sessions = SessionTracker::new(config.listener.max_sessions);

        let state = AppState {
            dialer: Arc::new(BackendDialer::new(&config.backend, settings)),
            settings,
            sessions: sessions.clone(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            sessions,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(relay_handler))
            .route("/", any(relay_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// A handle on the router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Live session tracking shared with the handlers.
    pub fn sessions(&self) -> SessionTracker {
        self.sessions.clone()
    }

    /// Run the server, accepting connections on the given listener until shutdown.
    ///
    /// Upgraded sessions are detached from the listener; they keep running
    /// after this returns and are drained by the caller.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(triggered(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
