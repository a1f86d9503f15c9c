//! Outbound connection to the fixed backend.

use std::time::Duration;

use tokio::time;
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;

use crate::config::BackendConfig;
use crate::relay::channel::DuplexChannel;
use crate::relay::error::DialError;
use crate::relay::RelaySettings;

/// Opens one fresh backend channel per session. Channels are never reused.
#[derive(Debug, Clone)]
pub struct BackendDialer {
    url: String,
    connect_timeout: Duration,
    settings: RelaySettings,
}

impl BackendDialer {
    pub fn new(config: &BackendConfig, settings: RelaySettings) -> Self {
        Self {
            url: config.url.clone(),
            connect_timeout: config.connect_timeout(),
            settings,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connect and complete the WebSocket handshake within the connect timeout.
    pub async fn dial(&self) -> Result<DuplexChannel, DialError> {
        let request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| DialError::InvalidUrl {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let connect = connect_async_with_config(request, Some(self.settings.websocket_config()), false);
        let (ws, response) = time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| DialError::Timeout {
                url: self.url.clone(),
                timeout: self.connect_timeout,
            })?
            .map_err(|e| DialError::Handshake {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(backend = %self.url, status = %response.status(), "Backend connected");

        Ok(DuplexChannel::from_tungstenite(ws, "backend", self.settings))
    }
}
