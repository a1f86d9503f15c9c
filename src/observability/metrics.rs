//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_sessions_total` (counter): sessions admitted
//! - `relay_active_sessions` (gauge): sessions currently relaying
//! - `relay_session_duration_seconds` (histogram): session lifetime
//! - `relay_messages_total` (counter): messages relayed, by direction
//! - `relay_failures_total` (counter): failures, by kind
//! - `relay_plain_requests_total` (counter): non-upgrade requests answered
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_session_opened() {
    metrics::counter!("relay_sessions_total").increment(1);
    metrics::gauge!("relay_active_sessions").increment(1.0);
}

pub fn record_session_released() {
    metrics::gauge!("relay_active_sessions").decrement(1.0);
}

pub fn record_session_duration(duration: Duration) {
    metrics::histogram!("relay_session_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_message(direction: &'static str) {
    metrics::counter!("relay_messages_total", "direction" => direction).increment(1);
}

pub fn record_failure(kind: &'static str) {
    metrics::counter!("relay_failures_total", "kind" => kind).increment(1);
}

pub fn record_plain_request() {
    metrics::counter!("relay_plain_requests_total").increment(1);
}
