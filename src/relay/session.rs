//! Session coordinator.
//!
//! # Responsibilities
//! - Pair the client channel with the backend channel
//! - Run one pump per direction, each wired to stop the other
//! - Wait for both pumps, then close both channels exactly once
//!
//! # State Transitions
//! ```text
//! Established → Relaying   pumps spawned
//! Relaying    → Draining   first pump report
//! Draining    → Closed     second pump report
//! ```

use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use crate::net::connection::SessionId;
use crate::relay::channel::DuplexChannel;
use crate::relay::pump::{Direction, Pump, PumpReport};
use crate::relay::RelaySettings;

/// Lifecycle of a session. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Established,
    Relaying,
    Draining,
    Closed,
}

impl SessionState {
    /// The state after the next lifecycle event.
    pub fn advance(self) -> Self {
        match self {
            SessionState::Established => SessionState::Relaying,
            SessionState::Relaying => SessionState::Draining,
            SessionState::Draining | SessionState::Closed => SessionState::Closed,
        }
    }
}

/// What a finished session did.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: SessionId,
    pub client_to_backend: u64,
    pub backend_to_client: u64,
    /// Direction whose failure ended the session.
    pub trigger: Option<Direction>,
    /// Error that ended the session, if any.
    pub cause: Option<String>,
    pub duration: Duration,
    pub state: SessionState,
}

/// One client ↔ backend relay pairing, torn down as a unit.
pub struct Session {
    id: SessionId,
    client: DuplexChannel,
    backend: DuplexChannel,
    settings: RelaySettings,
}

impl Session {
    pub fn new(
        id: SessionId,
        client: DuplexChannel,
        backend: DuplexChannel,
        settings: RelaySettings,
    ) -> Self {
        Self {
            id,
            client,
            backend,
            settings,
        }
    }

    /// Relay until either side stops, then close both sides.
    pub async fn run(self) -> SessionSummary {
        let Session {
            id,
            client,
            backend,
            settings,
        } = self;
        let started = Instant::now();
        let mut state = SessionState::Established;

        let (client_reader, client_writer) = client.split();
        let (backend_reader, backend_writer) = backend.split();

        let (completion_tx, mut completion_rx) = mpsc::channel::<PumpReport>(2);
        let (stop_upstream, upstream_peer_done) = oneshot::channel();
        let (stop_downstream, downstream_peer_done) = oneshot::channel();

        let upstream = Pump::new(
            Direction::ClientToBackend,
            client_reader,
            backend_writer,
            settings.ping_interval,
        );
        let downstream = Pump::new(
            Direction::BackendToClient,
            backend_reader,
            client_writer,
            settings.ping_interval,
        );

        let span = tracing::info_span!("session", session_id = %id);
        let handles = [
            tokio::spawn(
                upstream
                    .run(upstream_peer_done, stop_downstream, completion_tx.clone())
                    .instrument(span.clone()),
            ),
            tokio::spawn(
                downstream
                    .run(downstream_peer_done, stop_upstream, completion_tx)
                    .instrument(span),
            ),
        ];
        state = transition(id, state);

        let mut summary = SessionSummary {
            id,
            client_to_backend: 0,
            backend_to_client: 0,
            trigger: None,
            cause: None,
            duration: Duration::ZERO,
            state,
        };
        let mut writers = Vec::with_capacity(2);

        // Ends after two reports, or early if a pump panicked and dropped its sender.
        while let Some(report) = completion_rx.recv().await {
            state = transition(id, state);

            match report.direction {
                Direction::ClientToBackend => summary.client_to_backend = report.relayed,
                Direction::BackendToClient => summary.backend_to_client = report.relayed,
            }
            match report.exit.error() {
                Some(e) if summary.cause.is_none() => {
                    summary.trigger = Some(report.direction);
                    summary.cause = Some(e.to_string());
                }
                _ => {}
            }
            writers.push(report.destination);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(session_id = %id, error = %e, "Pump task failed");
            }
        }

        join_all(writers.iter_mut().map(|writer| writer.close())).await;
        drop(writers);

        if state != SessionState::Closed {
            state = SessionState::Closed;
            tracing::debug!(session_id = %id, "Session closed after pump failure");
        }

        summary.state = state;
        summary.duration = started.elapsed();
        summary
    }
}

fn transition(id: SessionId, from: SessionState) -> SessionState {
    let to = from.advance();
    tracing::debug!(session_id = %id, from = ?from, to = ?to, "Session state changed");
    to
}
