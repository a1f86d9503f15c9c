//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Init metrics → Bind listener → Serve
//!
//! Heartbeat (heartbeat.rs):
//!     Every interval → "Proxy alive" with live session count
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Stop accepting → Drain sessions (bounded) → Exit
//! ```

pub mod heartbeat;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
