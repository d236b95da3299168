//! Connection lifecycle types shared by the transport and the router

use serde::Serialize;

/// State of the single physical connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not started, or shut down
    #[default]
    Disconnected,
    /// First connection attempt in progress
    Connecting,
    /// Connected and pumping frames
    Connected,
    /// Lost a connection (or never got one) and retrying after backoff
    Reconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Lifecycle notification from the transport to the router.
///
/// Delivered in order over a single channel, so the router sees frames in
/// exactly the order the connection produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection established. `resumed` is true when a previous connection
    /// existed during this process lifetime.
    Opened { resumed: bool },
    /// Connection lost or closed
    Closed { reason: String },
    /// One raw inbound frame
    Message(Vec<u8>),
}
