//! Unidirectional relay loop.
//!
//! # Responsibilities
//! - Move messages from one channel's reader to the other channel's writer, in order
//! - Probe the destination while the source is quiet
//! - Stop when the peer pump finishes or on the first transport failure
//! - Tell the peer and the coordinator when it stops
//!
//! # Cancellation
//! The wait for the next message is a biased select over the peer-done signal,
//! the source and the probe timer, so the peer signal always wins. A send that
//! is already in flight is never interrupted; it is bounded by the write deadline.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::observability::metrics;
use crate::relay::channel::{ChannelReader, ChannelWriter, Message};
use crate::relay::error::TransportError;

/// Which half of the session a pump drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToBackend,
    BackendToClient,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToBackend => "client_to_backend",
            Direction::BackendToClient => "backend_to_client",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a pump stopped.
#[derive(Debug)]
pub enum PumpExit {
    /// The peer pump finished first.
    PeerDone,
    /// Receiving from the source failed or timed out.
    SourceFailed(TransportError),
    /// Sending (data or probe) to the destination failed or timed out.
    DestinationFailed(TransportError),
}

impl PumpExit {
    pub fn error(&self) -> Option<&TransportError> {
        match self {
            PumpExit::PeerDone => None,
            PumpExit::SourceFailed(e) | PumpExit::DestinationFailed(e) => Some(e),
        }
    }
}

/// Sent to the coordinator when a pump stops. Hands the destination writer back for closing.
pub struct PumpReport {
    pub direction: Direction,
    pub exit: PumpExit,
    pub relayed: u64,
    pub destination: ChannelWriter,
}

enum Step {
    Message(Message),
    Exit(PumpExit),
}

/// One direction of a session.
pub struct Pump {
    direction: Direction,
    source: ChannelReader,
    destination: ChannelWriter,
    ping_interval: Duration,
    relayed: u64,
}

impl Pump {
    pub fn new(
        direction: Direction,
        source: ChannelReader,
        destination: ChannelWriter,
        ping_interval: Duration,
    ) -> Self {
        Self {
            direction,
            source,
            destination,
            ping_interval,
            relayed: 0,
        }
    }

    /// Relay until stopped, then signal the peer and report to the coordinator.
    pub async fn run(
        mut self,
        mut peer_done: oneshot::Receiver<()>,
        notify_peer: oneshot::Sender<()>,
        completion: mpsc::Sender<PumpReport>,
    ) {
        let exit = self.relay(&mut peer_done).await;

        match exit.error() {
            None => tracing::debug!(direction = %self.direction, relayed = self.relayed, "Pump stopped by peer"),
            Some(e) => {
                tracing::debug!(direction = %self.direction, relayed = self.relayed, error = %e, "Pump stopped");
                metrics::record_failure(e.kind());
            }
        }

        // A peer that already stopped has dropped its receiver; nothing to do then.
        let _ = notify_peer.send(());

        let Pump {
            direction,
            source,
            destination,
            relayed,
            ..
        } = self;
        drop(source);

        let report = PumpReport {
            direction,
            exit,
            relayed,
            destination,
        };
        if completion.send(report).await.is_err() {
            tracing::warn!(direction = %direction, "Coordinator gone before pump report");
        }
    }

    async fn relay(&mut self, peer_done: &mut oneshot::Receiver<()>) -> PumpExit {
        let mut probe = time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        probe.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let message = match self.next_message(peer_done, &mut probe).await {
                Step::Message(message) => message,
                Step::Exit(exit) => return exit,
            };

            if let Err(e) = self.destination.send(message).await {
                return PumpExit::DestinationFailed(e);
            }
            self.relayed += 1;
            metrics::record_message(self.direction.as_str());
        }
    }

    async fn next_message(
        &mut self,
        peer_done: &mut oneshot::Receiver<()>,
        probe: &mut Interval,
    ) -> Step {
        // Pinned once so probe ticks do not restart the read deadline.
        let receive = self.source.receive();
        tokio::pin!(receive);

        loop {
            tokio::select! {
                biased;
                _ = &mut *peer_done => return Step::Exit(PumpExit::PeerDone),
                result = &mut receive => {
                    return match result {
                        Ok(message) => Step::Message(message),
                        Err(e) => Step::Exit(PumpExit::SourceFailed(e)),
                    };
                }
                _ = probe.tick() => {
                    if let Err(e) = self.destination.ping().await {
                        return Step::Exit(PumpExit::DestinationFailed(e));
                    }
                }
            }
        }
    }
}
