//! Relay engine subsystem.
//!
//! # Data Flow
//! ```text
//! upgraded client socket ──┐
//!                          ├─→ session.rs (coordinator)
//! dialer.rs → backend ─────┘        │
//!                                   ├─→ pump.rs  client → backend
//!                                   └─→ pump.rs  backend → client
//!
//! first pump exits  → peer-done signal → second pump exits
//! both pumps report → both channels closed
//! ```
//!
//! # Design Decisions
//! - Two tasks per session, one per direction; no locks on the data path
//! - Every blocking I/O call carries a deadline
//! - Any transport failure tears the whole session down; nothing is retried

pub mod channel;
pub mod dialer;
pub mod error;
pub mod pump;
pub mod session;

use std::time::Duration;

use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::config::RelayConfig;

pub use channel::{ChannelReader, ChannelWriter, DuplexChannel, Message};
pub use dialer::BackendDialer;
pub use error::{DialError, TransportError};
pub use pump::{Direction, Pump, PumpExit, PumpReport};
pub use session::{Session, SessionState, SessionSummary};

/// Deadlines and limits shared by every channel of every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySettings {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub ping_interval: Duration,
    pub max_frame_size: usize,
}

impl RelaySettings {
    /// Codec limits for sockets opened with tokio-tungstenite.
    pub fn websocket_config(&self) -> WebSocketConfig {
        let mut config = WebSocketConfig::default();
        config.max_message_size = Some(self.max_frame_size);
        config.max_frame_size = Some(self.max_frame_size);
        config
    }
}

impl From<&RelayConfig> for RelaySettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            read_timeout: Duration::from_secs(config.read_timeout_secs),
            write_timeout: Duration::from_secs(config.write_timeout_secs),
            ping_interval: Duration::from_secs(config.ping_interval_secs),
            max_frame_size: config.max_frame_size,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}
