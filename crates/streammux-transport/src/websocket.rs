//! WebSocket connector
//!
//! Frames are JSON text. Outbound frames that are valid UTF-8 go out as text
//! messages; inbound text and binary messages are both passed up as bytes.

use async_trait::async_trait;
use futures::{future, SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::debug;
use url::Url;

use crate::connector::{Connector, Link, TransportError};

/// Connects to a `ws://` endpoint
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: Url,
}

impl WebSocketConnector {
    pub fn new(url: &str) -> Result<Self, TransportError> {
        let url = Url::parse(url)
            .map_err(|e| TransportError::UnsupportedEndpoint(format!("{}: {}", url, e)))?;
        if url.scheme() != "ws" {
            return Err(TransportError::UnsupportedEndpoint(format!(
                "{} (expected a ws:// url)",
                url
            )));
        }
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Link, TransportError> {
        let (socket, response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!(status = %response.status(), url = %self.url, "[Transport] WebSocket handshake complete");

        let (sink, source) = socket.split();
        let sink = sink
            .sink_map_err(|e| TransportError::Io(e.to_string()))
            .with(|frame: Vec<u8>| future::ready(Ok::<_, TransportError>(frame_to_message(frame))));
        let source = source.filter_map(|message| future::ready(message_to_frame(message)));

        Ok(Link {
            sink: Box::pin(sink),
            source: Box::pin(source),
        })
    }

    fn endpoint(&self) -> String {
        self.url.to_string()
    }
}

fn frame_to_message(frame: Vec<u8>) -> Message {
    match String::from_utf8(frame) {
        Ok(text) => Message::Text(text),
        Err(e) => Message::Binary(e.into_bytes()),
    }
}

fn message_to_frame(message: Result<Message, WsError>) -> Option<Result<Vec<u8>, TransportError>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(text.into_bytes())),
        Ok(Message::Binary(bytes)) => Some(Ok(bytes)),
        // Close is followed by end-of-stream; control frames are handled by tungstenite
        Ok(Message::Close(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
        Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Some(Err(TransportError::Closed)),
        Err(e) => Some(Err(TransportError::Io(e.to_string()))),
    }
}
