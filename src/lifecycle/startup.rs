//! Startup orchestration.
//!
//! # Order
//! 1. Metrics exporter (optional)
//! 2. Bind listener (fail fast)
//! 3. Heartbeat and signal listener
//! 4. Serve until shutdown, then drain live sessions

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::heartbeat::run_heartbeat;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_listener;
use crate::observability::metrics;

/// Run the proxy until a termination signal arrives.
pub async fn run(config: ProxyConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    serve(config, listener, shutdown).await?;
    Ok(())
}

/// Serve on an already-bound listener until `shutdown` triggers.
pub async fn serve(
    config: ProxyConfig,
    listener: TcpListener,
    shutdown: Shutdown,
) -> Result<(), std::io::Error> {
    let drain_timeout = Duration::from_secs(config.shutdown.drain_timeout_secs);
    let heartbeat_interval = Duration::from_secs(config.observability.heartbeat_interval_secs);

    let server = HttpServer::new(config);
    let sessions = server.sessions();

    let heartbeat = tokio::spawn(run_heartbeat(
        heartbeat_interval,
        sessions.clone(),
        shutdown.subscribe(),
    ));

    server.run(listener, shutdown.subscribe()).await?;

    let remaining = sessions.active_count();
    if remaining > 0 {
        tracing::info!(active_sessions = remaining, timeout = ?drain_timeout, "Draining sessions");
        if !sessions.wait_for_drain(drain_timeout).await {
            tracing::warn!(
                active_sessions = sessions.active_count(),
                "Drain timeout elapsed, abandoning sessions"
            );
        }
    }

    // The heartbeat holds its own subscription; make sure it has seen the trigger.
    shutdown.trigger();
    let _ = heartbeat.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
