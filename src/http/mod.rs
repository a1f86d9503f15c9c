//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → websocket.rs (upgrade detection)
//!         ├─ no Upgrade header → response.rs (JSON envelope, HTTP 200)
//!         └─ Upgrade header    → handshake → dial backend → relay session
//! ```

pub mod response;
pub mod server;
pub mod websocket;

pub use response::CommResponse;
pub use server::{AppState, HttpServer};
