//! Relay error definitions.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single send or receive on a duplex channel.
///
/// Every variant is terminal for the pump that observes it.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the connection or the transport is gone.
    #[error("connection closed")]
    Closed,

    /// The read or write deadline elapsed.
    #[error("deadline of {0:?} elapsed")]
    Timeout(Duration),

    /// A received message exceeded the configured frame limit.
    #[error("message of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { size: usize, limit: usize },

    /// Framing or protocol violation reported by the WebSocket codec.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Closed => "closed",
            TransportError::Timeout(_) => "timeout",
            TransportError::FrameTooLarge { .. } => "capacity",
            TransportError::Protocol(_) => "protocol",
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
            other => TransportError::Protocol(other.to_string()),
        }
    }
}

/// Axum wraps the tungstenite error of the upgraded socket; unwrap it so a
/// dropped client reads as `Closed`.
impl From<axum::Error> for TransportError {
    fn from(err: axum::Error) -> Self {
        match err.into_inner().downcast::<tokio_tungstenite::tungstenite::Error>() {
            Ok(ws) => TransportError::from(*ws),
            Err(other) => TransportError::Protocol(other.to_string()),
        }
    }
}

/// Failure to open the outbound channel to the backend.
#[derive(Debug, Error)]
pub enum DialError {
    #[error("invalid backend url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("backend {url} did not answer within {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("backend {url} handshake failed: {reason}")]
    Handshake { url: String, reason: String },
}
