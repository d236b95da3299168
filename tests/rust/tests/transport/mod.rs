//! Transport integration tests
//!
//! Connection lifecycle, reconnect behavior and the outbound queue, run
//! against the in-memory connector.

mod queue;
mod reconnect;
