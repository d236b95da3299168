//! Inbound events
//!
//! An [`Event`] is the decoded form of one inbound frame. Two envelope shapes
//! are accepted on the wire and both decode to the same value:
//!
//! ```json
//! { "type": "monitoring", "subtype": "newrelic", "event": { "type": "availableResponse", "result": true } }
//! { "response": "NewRelicResponse", "type": "availableResponse", "result": true }
//! ```
//!
//! The top-level fields (everything except `event`) are the *envelope
//! attributes*; the fields of the nested `event` object are the *payload*.
//! The event type is taken from the payload when present, otherwise from the
//! envelope.

use serde_json::{Map, Value};

/// Type name of the synthetic event emitted after a reconnect.
pub const STREAM_REOPENED: &str = "StreamReopened";

/// Type name carried by events that failed to decode.
pub const DECODE_ERROR: &str = "DecodeError";

// ============================================================================
// EVENT KIND
// ============================================================================

/// Protocol-level discriminator of an event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Envelope carried a `response` field (e.g. `NewRelicResponse`)
    Response(String),
    /// Envelope carried a `request` field
    Request(String),
    /// Envelope had neither discriminator (e.g. `{ "type": "monitoring", ... }`)
    Notification,
    /// Synthesized locally by the router, never seen on the wire
    Local,
    /// Inbound bytes could not be decoded
    DecodeError,
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Response(name) | Self::Request(name) => name,
            Self::Notification => "notification",
            Self::Local => "local",
            Self::DecodeError => "decode_error",
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

// ============================================================================
// EVENT
// ============================================================================

/// One decoded inbound message. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: EventKind,
    event_type: String,
    attributes: Map<String, Value>,
    payload: Map<String, Value>,
}

impl Event {
    pub fn new(kind: EventKind, event_type: impl Into<String>) -> Self {
        Self {
            kind,
            event_type: event_type.into(),
            attributes: Map::new(),
            payload: Map::new(),
        }
    }

    /// Build an event from already-split envelope and payload maps
    pub fn from_parts(
        kind: EventKind,
        event_type: impl Into<String>,
        attributes: Map<String, Value>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            kind,
            event_type: event_type.into(),
            attributes,
            payload,
        }
    }

    /// The synthetic event dispatched when the stream comes back after a drop
    pub fn stream_reopened() -> Self {
        Self::new(EventKind::Local, STREAM_REOPENED)
    }

    /// Placeholder event for bytes that failed to decode.
    ///
    /// `raw` is kept (lossily, as UTF-8) for diagnostics only.
    pub fn decode_error(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::new(EventKind::DecodeError, DECODE_ERROR)
            .with_attribute("reason", reason.into())
            .with_attribute("raw", raw.into())
    }

    /// Add an envelope attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Add a payload field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn is_decode_error(&self) -> bool {
        self.kind == EventKind::DecodeError
    }

    pub fn is_stream_reopened(&self) -> bool {
        self.kind.is_local() && self.event_type == STREAM_REOPENED
    }

    /// Look up a named field: envelope attributes first, then the payload.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes
            .get(name)
            .or_else(|| self.payload.get(name))
    }

    pub fn envelope(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// The `subtype` envelope attribute, used for sub-routing
    pub fn subtype(&self) -> Option<&str> {
        self.attributes.get("subtype").and_then(Value::as_str)
    }

    pub fn str_attr(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    pub fn bool_attr(&self, name: &str) -> Option<bool> {
        self.attribute(name).and_then(Value::as_bool)
    }

    pub fn f64_attr(&self, name: &str) -> Option<f64> {
        self.attribute(name).and_then(Value::as_f64)
    }

    pub fn u64_attr(&self, name: &str) -> Option<u64> {
        self.attribute(name).and_then(Value::as_u64)
    }
}
