//! # StreamMux Transport
//!
//! Owns the single physical connection to the backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Transport                           │
//! │                                                              │
//! │   Connector::connect() ──► Link { sink, source }             │
//! │        │                        │                            │
//! │        │ (fails)                ├─ source ─► TransportEvent  │
//! │        ▼                        └─ sink   ◄─ OutboundQueue   │
//! │   Reconnecting ── backoff ──► retry                          │
//! └──────────────────────────────────────────────────────────────┘
//!            │ TransportEvent                ▲ encoded frames
//!            ▼                               │
//!      ┌────────────────────────────────────────────┐
//!      │                EventRouter                 │
//!      └────────────────────────────────────────────┘
//! ```
//!
//! Connection loss is a state, never an error to callers above the
//! transport. Frames sent while disconnected are queued (bounded, oldest
//! dropped first) and flushed in order on the next open. Nothing is replayed
//! from the backend after a reconnect.

pub mod connector;
pub mod memory;
mod queue;
pub mod runtime;
pub mod transport;
pub mod websocket;

pub use connector::{Connector, FrameSink, FrameSource, Link, TransportError};
pub use memory::{memory_connector, MemoryConnector, MemoryListener, MemoryPeer};
pub use runtime::StreamRuntime;
pub use transport::Transport;
pub use websocket::WebSocketConnector;
