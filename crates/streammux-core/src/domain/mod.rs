//! Domain types: events, commands and connection lifecycle

pub mod command;
pub mod connection;
pub mod event;

pub use command::Command;
pub use connection::{ConnectionState, TransportEvent};
pub use event::{Event, EventKind, DECODE_ERROR, STREAM_REOPENED};
