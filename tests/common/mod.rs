//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, connect_async, MaybeTlsStream, WebSocketStream};

use ws_reverse_proxy::config::ProxyConfig;
use ws_reverse_proxy::http::HttpServer;
use ws_reverse_proxy::lifecycle::Shutdown;
use ws_reverse_proxy::net::SessionTracker;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What a scripted backend saw, tagged with its per-connection number (from 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    Connected(usize),
    Message(usize, String),
    Closed(usize),
}

/// How a scripted backend answers a text message.
#[allow(dead_code)]
pub enum Action {
    Reply(String),
    Ignore,
    Close,
}

/// Start a WebSocket backend that answers text per `script` and echoes binary.
pub async fn start_scripted_backend<F>(script: F) -> (SocketAddr, mpsc::UnboundedReceiver<BackendEvent>)
where
    F: Fn(&str) -> Action + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (events, rx) = mpsc::unbounded_channel();
    let script = Arc::new(script);

    tokio::spawn(async move {
        let mut next_id = 0;
        while let Ok((stream, _)) = listener.accept().await {
            next_id += 1;
            let id = next_id;
            let events = events.clone();
            let script = script.clone();

            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                let _ = events.send(BackendEvent::Connected(id));

                while let Some(Ok(msg)) = ws.next().await {
                    let text = match msg {
                        Message::Text(text) => text.as_str().to_owned(),
                        Message::Binary(data) => {
                            if ws.send(Message::Binary(data)).await.is_err() {
                                break;
                            }
                            continue;
                        }
                        Message::Close(_) => break,
                        _ => continue,
                    };
                    let _ = events.send(BackendEvent::Message(id, text.clone()));

                    match script(&text) {
                        Action::Reply(reply) => {
                            if ws.send(Message::text(reply)).await.is_err() {
                                break;
                            }
                        }
                        Action::Ignore => {}
                        Action::Close => {
                            let _ = ws.close(None).await;
                            break;
                        }
                    }
                }
                let _ = events.send(BackendEvent::Closed(id));
            });
        }
    });

    (addr, rx)
}

/// A backend that echoes every text message.
#[allow(dead_code)]
pub async fn start_echo_backend() -> (SocketAddr, mpsc::UnboundedReceiver<BackendEvent>) {
    start_scripted_backend(|text| Action::Reply(text.to_string())).await
}

/// A running proxy. Shuts down when dropped.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub sessions: SessionTracker,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    #[allow(dead_code)]
    pub fn http_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub async fn connect(&self) -> Client {
        let (ws, _) = connect_async(self.ws_url()).await.expect("proxy must accept the upgrade");
        ws
    }

    /// Wait until no session is live.
    #[allow(dead_code)]
    pub async fn wait_for_no_sessions(&self) {
        assert!(
            self.sessions.wait_for_drain(Duration::from_secs(5)).await,
            "sessions still live: {}",
            self.sessions.active_count()
        );
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the proxy on an ephemeral port, relaying to `backend`.
pub async fn start_proxy(backend: SocketAddr, configure: impl FnOnce(&mut ProxyConfig)) -> TestProxy {
    let mut config = ProxyConfig::default();
    config.backend.url = format!("ws://{}/", backend);
    configure(&mut config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let server = HttpServer::new(config);
    let sessions = server.sessions();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy {
        addr,
        sessions,
        shutdown,
    }
}

/// Next backend event, failing the test after five seconds.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<BackendEvent>) -> BackendEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("backend event expected")
        .expect("backend stopped")
}

/// Next data message seen by a client, skipping control frames.
/// `None` once the connection is closed.
pub async fn next_data(ws: &mut Client) -> Option<Message> {
    let read = async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
                Some(Ok(msg)) => return Some(msg),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("client expected a message or a close")
}

/// Next text message seen by a client.
pub async fn next_text(ws: &mut Client) -> Option<String> {
    next_data(ws).await.map(|msg| match msg {
        Message::Text(text) => text.as_str().to_owned(),
        other => panic!("expected text, got {other:?}"),
    })
}

/// A port nothing listens on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap()
}
