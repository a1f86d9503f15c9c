//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Detect WebSocket upgrade requests (presence of an `Upgrade` header)
//! - Answer everything else with the JSON envelope
//! - Complete upgrade handshake with client
//! - Establish WebSocket connection to backend
//! - Hand both channels to the session coordinator
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Proxy ←──── WebSocket frames ────→ Backend
//! ```
//!
//! # Failure Handling
//! - Upgrade rejected: rejection returned, backend never dialed
//! - Dial failed: client channel closed without relay
//! - Transport failure mid-session: both sides torn down by the coordinator

use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        ConnectInfo, FromRequestParts, Request, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::response::CommResponse;
use crate::http::server::AppState;
use crate::net::SessionGuard;
use crate::observability::metrics;
use crate::relay::{DuplexChannel, Session};

/// Entry point for every request on the relay path.
pub async fn relay_handler(State(state): State<AppState>, request: Request) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    if !request.headers().contains_key(header::UPGRADE) {
        tracing::debug!(peer = ?peer, method = %request.method(), "Not a websocket request");
        metrics::record_plain_request();
        return CommResponse::not_websocket().into_response();
    }

    let (mut parts, _body) = request.into_parts();
    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            tracing::warn!(peer = ?peer, error = %rejection, "Websocket upgrade rejected");
            metrics::record_failure("upgrade");
            return rejection.into_response();
        }
    };

    let Some(guard) = state.sessions.try_track() else {
        tracing::warn!(
            peer = ?peer,
            active_sessions = state.sessions.active_count(),
            "Session limit reached"
        );
        metrics::record_failure("session_limit");
        return CommResponse::too_many_sessions().with_status(StatusCode::SERVICE_UNAVAILABLE);
    };

    let max_frame_size = state.settings.max_frame_size;
    upgrade
        .max_message_size(max_frame_size)
        .max_frame_size(max_frame_size)
        .on_failed_upgrade(move |e| {
            tracing::warn!(peer = ?peer, error = %e, "Websocket upgrade failed");
            metrics::record_failure("upgrade");
        })
        .on_upgrade(move |socket| serve_session(socket, state, guard, peer))
}

async fn serve_session(
    socket: WebSocket,
    state: AppState,
    guard: SessionGuard,
    peer: Option<SocketAddr>,
) {
    let id = guard.id();
    let client = DuplexChannel::from_axum(socket, "client", state.settings);

    let backend = match state.dialer.dial().await {
        Ok(backend) => backend,
        Err(e) => {
            tracing::warn!(session_id = %id, peer = ?peer, error = %e, "Backend dial failed");
            metrics::record_failure("dial");
            client.close().await;
            return;
        }
    };

    tracing::info!(
        session_id = %id,
        peer = ?peer,
        backend = %state.dialer.url(),
        "Session established"
    );

    let summary = Session::new(id, client, backend, state.settings).run().await;
    metrics::record_session_duration(summary.duration);

    tracing::info!(
        session_id = %id,
        client_to_backend = summary.client_to_backend,
        backend_to_client = summary.backend_to_client,
        trigger = ?summary.trigger,
        cause = summary.cause.as_deref().unwrap_or("none"),
        duration_ms = summary.duration.as_millis() as u64,
        "Session closed"
    );

    drop(guard);
}
