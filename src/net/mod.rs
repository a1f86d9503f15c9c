//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Upgrade request accepted by the HTTP layer
//!     → connection.rs (reserve a session slot, assign a session ID)
//!     → Hand off to the relay engine
//!     → slot released when the session ends
//! ```
//!
//! # Design Decisions
//! - Bounded session count prevents resource exhaustion
//! - Each session tracked for graceful shutdown

pub mod connection;

pub use connection::{SessionGuard, SessionId, SessionTracker};
