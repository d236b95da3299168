//! Connector abstraction
//!
//! A [`Connector`] knows how to open one physical link. The transport owns
//! the retry loop; connectors never retry on their own.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};
use thiserror::Error;

/// Transport-level failures. Never surfaced past the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("unsupported endpoint: {0}")]
    UnsupportedEndpoint(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("connection closed")]
    Closed,
}

/// Outbound half of a link
pub type FrameSink = Pin<Box<dyn Sink<Vec<u8>, Error = TransportError> + Send>>;

/// Inbound half of a link
pub type FrameSource = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// One open physical connection
pub struct Link {
    pub sink: FrameSink,
    pub source: FrameSource,
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new link
    async fn connect(&self) -> Result<Link, TransportError>;

    /// Human-readable endpoint, for logs
    fn endpoint(&self) -> String;
}
