//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and the backend URL
//! - Validate value ranges (timeouts > 0, probe interval below read timeout)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. "relay.read_timeout_secs").
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_sessions == 0 {
        errors.push(ValidationError::new("listener.max_sessions", "must be greater than 0"));
    }

    match Url::parse(&config.backend.url) {
        Ok(url) => {
            if url.scheme() != "ws" {
                errors.push(ValidationError::new(
                    "backend.url",
                    format!("unsupported scheme '{}', expected 'ws'", url.scheme()),
                ));
            }
            if url.host_str().is_none() {
                errors.push(ValidationError::new("backend.url", "missing host"));
            }
        }
        Err(e) => errors.push(ValidationError::new("backend.url", e.to_string())),
    }
    if config.backend.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("backend.connect_timeout_secs", "must be greater than 0"));
    }

    let relay = &config.relay;
    if relay.read_timeout_secs == 0 {
        errors.push(ValidationError::new("relay.read_timeout_secs", "must be greater than 0"));
    }
    if relay.write_timeout_secs == 0 {
        errors.push(ValidationError::new("relay.write_timeout_secs", "must be greater than 0"));
    }
    if relay.ping_interval_secs == 0 || relay.ping_interval_secs >= relay.read_timeout_secs {
        errors.push(ValidationError::new(
            "relay.ping_interval_secs",
            format!(
                "must be between 1 and read_timeout_secs - 1 (got {})",
                relay.ping_interval_secs
            ),
        ));
    }
    if relay.max_frame_size == 0 {
        errors.push(ValidationError::new("relay.max_frame_size", "must be greater than 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }
    if observability.heartbeat_interval_secs == 0 {
        errors.push(ValidationError::new(
            "observability.heartbeat_interval_secs",
            "must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
