//! WebSocket Reverse Proxy
//!
//! A transparent WebSocket relay built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                 WEBSOCKET REVERSE PROXY              │
//!                     │                                                      │
//!   Client Upgrade    │  ┌─────────┐    ┌───────────┐    ┌──────────────┐    │
//!   ──────────────────┼─▶│  http   │───▶│ websocket │───▶│    dialer    │────┼──▶ Backend
//!                     │  │ server  │    │  upgrade  │    │ (fixed url)  │    │
//!                     │  └─────────┘    └─────┬─────┘    └──────┬───────┘    │
//!                     │                       │                 │            │
//!                     │                       ▼                 ▼            │
//!                     │               ┌──────────────────────────────────┐   │
//!                     │               │        session coordinator       │   │
//!                     │               │  pump client→backend             │   │
//!                     │               │  pump backend→client             │   │
//!                     │               └──────────────────────────────────┘   │
//!                     │                                                      │
//!                     │  ┌────────────────────────────────────────────────┐  │
//!                     │  │ config · observability · lifecycle · net       │  │
//!                     │  └────────────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use ws_reverse_proxy::config::{load_config, ProxyConfig};
use ws_reverse_proxy::lifecycle::startup;
use ws_reverse_proxy::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "ws-reverse-proxy")]
#[command(about = "Transparent WebSocket reverse proxy", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config_file = ?cli.config,
        "ws-reverse-proxy starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.url,
        read_timeout_secs = config.relay.read_timeout_secs,
        write_timeout_secs = config.relay.write_timeout_secs,
        max_frame_size = config.relay.max_frame_size,
        "Configuration loaded"
    );

    startup::run(config).await
}
