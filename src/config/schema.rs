//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the WebSocket reverse proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, session limit).
    pub listener: ListenerConfig,

    /// The single backend every session is relayed to.
    pub backend: BackendConfig,

    /// Relay deadlines and frame limits.
    pub relay: RelayConfig,

    /// Timeout configuration for plain HTTP handling.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Shutdown behaviour.
    pub shutdown: ShutdownConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8866").
    pub bind_address: String,

    /// Maximum concurrent relay sessions (backpressure).
    pub max_sessions: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8866".to_string(),
            max_sessions: 10_000,
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend WebSocket URL (e.g., "ws://127.0.0.1:8081/").
    pub url: String,

    /// Dial + handshake timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8081/".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

impl BackendConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Relay deadlines and limits, applied to both halves of every session.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Seconds a channel may stay silent (no data, no probe answer).
    pub read_timeout_secs: u64,

    /// Seconds a single write may take.
    pub write_timeout_secs: u64,

    /// Seconds between liveness probes. Must be below the read timeout.
    pub ping_interval_secs: u64,

    /// Maximum message and frame size in bytes.
    pub max_frame_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            read_timeout_secs: 60,
            write_timeout_secs: 60,
            ping_interval_secs: 54,
            max_frame_size: 30 * 1024,
        }
    }
}

/// Timeout configuration for non-relay operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Seconds between "proxy alive" log lines.
    pub heartbeat_interval_secs: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            heartbeat_interval_secs: 10,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Seconds to wait for live sessions after the listener stops.
    pub drain_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 5,
        }
    }
}
