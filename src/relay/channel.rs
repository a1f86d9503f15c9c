//! Duplex channel abstraction.
//!
//! # Responsibilities
//! - Wrap an established WebSocket (accepted or dialed) behind one frame type
//! - Enforce the read deadline, refreshed on every call and on every probe frame
//! - Enforce the write deadline on every send and probe
//! - Re-check the frame limit on every received data message
//!
//! # Design Decisions
//! - A channel is split into a reader and a writer; each half has exactly one owner
//! - Text stays text and binary stays binary
//! - Close is idempotent and never fails

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use axum::extract::ws::{Message as AxumMessage, WebSocket};
use futures_util::future;
use futures_util::sink::Sink;
use futures_util::stream::BoxStream;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

use crate::relay::error::TransportError;
use crate::relay::RelaySettings;

/// An application message relayed between client and backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
}

impl Message {
    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        match self {
            Message::Text(text) => text.len(),
            Message::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything that can travel over a channel, data and control alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data(Message),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

type FrameStream = BoxStream<'static, Result<Frame, TransportError>>;
type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;

/// One live connection endpoint: the client side or the backend side of a session.
pub struct DuplexChannel {
    reader: ChannelReader,
    writer: ChannelWriter,
}

impl DuplexChannel {
    /// Wrap a socket accepted through the axum upgrade.
    pub fn from_axum(socket: WebSocket, label: &'static str, settings: RelaySettings) -> Self {
        let (sink, stream) = socket.split();
        let stream = stream
            .map(|item| item.map(frame_from_axum).map_err(TransportError::from))
            .boxed();
        let sink = sink
            .sink_map_err(TransportError::from)
            .with(|frame: Frame| future::ready(Ok::<_, TransportError>(frame_into_axum(frame))));
        Self::from_parts(label, stream, Box::pin(sink), settings)
    }

    /// Wrap a tokio-tungstenite stream (dialed backend, or any raw socket).
    pub fn from_tungstenite<S>(
        ws: WebSocketStream<S>,
        label: &'static str,
        settings: RelaySettings,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = ws.split();
        let stream = stream
            .map(|item| item.map_err(TransportError::from).and_then(frame_from_tungstenite))
            .boxed();
        let sink = sink
            .sink_map_err(TransportError::from)
            .with(|frame: Frame| future::ready(Ok::<_, TransportError>(frame_into_tungstenite(frame))));
        Self::from_parts(label, stream, Box::pin(sink), settings)
    }

    fn from_parts(
        label: &'static str,
        stream: FrameStream,
        sink: FrameSink,
        settings: RelaySettings,
    ) -> Self {
        Self {
            reader: ChannelReader {
                label,
                stream,
                read_timeout: settings.read_timeout,
                max_frame_size: settings.max_frame_size,
            },
            writer: ChannelWriter {
                label,
                sink,
                write_timeout: settings.write_timeout,
                closed: false,
            },
        }
    }

    /// Separate the read half from the write half.
    pub fn split(self) -> (ChannelReader, ChannelWriter) {
        (self.reader, self.writer)
    }

    /// Close the channel without relaying anything over it.
    pub async fn close(self) {
        let (reader, mut writer) = self.split();
        writer.close().await;
        drop(reader);
    }
}

impl fmt::Debug for DuplexChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuplexChannel")
            .field("label", &self.reader.label)
            .field("closed", &self.writer.closed)
            .finish_non_exhaustive()
    }
}

/// Read half of a [`DuplexChannel`].
pub struct ChannelReader {
    label: &'static str,
    stream: FrameStream,
    read_timeout: Duration,
    max_frame_size: usize,
}

impl ChannelReader {
    /// Wait for the next data message.
    ///
    /// Ping and pong frames restart the read deadline and are not returned.
    pub async fn receive(&mut self) -> Result<Message, TransportError> {
        loop {
            let next = time::timeout(self.read_timeout, self.stream.next())
                .await
                .map_err(|_| TransportError::Timeout(self.read_timeout))?;

            match next {
                Some(Ok(Frame::Data(message))) => {
                    if message.len() > self.max_frame_size {
                        return Err(TransportError::FrameTooLarge {
                            size: message.len(),
                            limit: self.max_frame_size,
                        });
                    }
                    return Ok(message);
                }
                Some(Ok(Frame::Ping(_))) | Some(Ok(Frame::Pong(_))) => {
                    tracing::trace!(channel = self.label, "Liveness frame received");
                }
                Some(Ok(Frame::Close)) | None => return Err(TransportError::Closed),
                Some(Err(e)) => return Err(e),
            }
        }
    }
}

/// Write half of a [`DuplexChannel`].
pub struct ChannelWriter {
    label: &'static str,
    sink: FrameSink,
    write_timeout: Duration,
    closed: bool,
}

impl ChannelWriter {
    /// Send one data message within the write deadline.
    pub async fn send(&mut self, message: Message) -> Result<(), TransportError> {
        self.write(Frame::Data(message)).await
    }

    /// Send a liveness probe within the write deadline.
    pub async fn ping(&mut self) -> Result<(), TransportError> {
        self.write(Frame::Ping(Vec::new())).await
    }

    async fn write(&mut self, frame: Frame) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        time::timeout(self.write_timeout, self.sink.send(frame))
            .await
            .map_err(|_| TransportError::Timeout(self.write_timeout))?
    }

    /// Send a close frame (best effort) and release the sink. Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        match time::timeout(self.write_timeout, self.sink.close()).await {
            Ok(Ok(())) => tracing::trace!(channel = self.label, "Channel closed"),
            Ok(Err(e)) => tracing::trace!(channel = self.label, error = %e, "Close on failed channel"),
            Err(_) => tracing::debug!(channel = self.label, "Close frame not flushed before deadline"),
        }
    }
}

fn frame_from_axum(message: AxumMessage) -> Frame {
    match message {
        AxumMessage::Text(text) => Frame::Data(Message::Text(text.as_str().to_owned())),
        AxumMessage::Binary(data) => Frame::Data(Message::Binary(data.to_vec())),
        AxumMessage::Ping(data) => Frame::Ping(data.to_vec()),
        AxumMessage::Pong(data) => Frame::Pong(data.to_vec()),
        AxumMessage::Close(_) => Frame::Close,
    }
}

fn frame_into_axum(frame: Frame) -> AxumMessage {
    match frame {
        Frame::Data(Message::Text(text)) => AxumMessage::Text(text.into()),
        Frame::Data(Message::Binary(data)) => AxumMessage::Binary(data.into()),
        Frame::Ping(data) => AxumMessage::Ping(data.into()),
        Frame::Pong(data) => AxumMessage::Pong(data.into()),
        Frame::Close => AxumMessage::Close(None),
    }
}

fn frame_from_tungstenite(message: WsMessage) -> Result<Frame, TransportError> {
    match message {
        WsMessage::Text(text) => Ok(Frame::Data(Message::Text(text.as_str().to_owned()))),
        WsMessage::Binary(data) => Ok(Frame::Data(Message::Binary(data.to_vec()))),
        WsMessage::Ping(data) => Ok(Frame::Ping(data.to_vec())),
        WsMessage::Pong(data) => Ok(Frame::Pong(data.to_vec())),
        WsMessage::Close(_) => Ok(Frame::Close),
        WsMessage::Frame(_) => Err(TransportError::Protocol("unexpected raw frame".into())),
    }
}

fn frame_into_tungstenite(frame: Frame) -> WsMessage {
    match frame {
        Frame::Data(Message::Text(text)) => WsMessage::Text(text.into()),
        Frame::Data(Message::Binary(data)) => WsMessage::Binary(data.into()),
        Frame::Ping(data) => WsMessage::Ping(data.into()),
        Frame::Pong(data) => WsMessage::Pong(data.into()),
        Frame::Close => WsMessage::Close(None),
    }
}
