//! Periodic liveness log.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::net::SessionTracker;

/// Log "proxy alive" every `interval` until shutdown.
pub async fn run_heartbeat(
    interval: Duration,
    sessions: SessionTracker,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tracing::info!(active_sessions = sessions.active_count(), "Proxy alive");
            }
            _ = shutdown.recv() => {
                tracing::debug!("Heartbeat stopping");
                break;
            }
        }
    }
}
