//! JSON wire codec
//!
//! `encode` turns a [`Command`] into one frame. `decode` is total: malformed
//! input becomes an [`Event`] of kind [`EventKind::DecodeError`] instead of an
//! error, so nothing can fail on the transport's receive path.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{Command, Event, EventKind};

/// Errors produced while decoding or encoding a frame
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("nested `event` must be a JSON object, got {0}")]
    InvalidPayload(&'static str),

    #[error("`{0}` discriminator must be a string")]
    InvalidDiscriminator(&'static str),

    #[error("message has no `type`")]
    MissingType,
}

/// Codec for the JSON envelope
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }

    /// Serialize a command to one frame
    pub fn encode(&self, command: &Command) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(&command.to_value())?)
    }

    /// Decode one frame; never fails
    pub fn decode(&self, bytes: &[u8]) -> Event {
        match self.try_decode(bytes) {
            Ok(event) => event,
            Err(e) => Event::decode_error(e.to_string(), String::from_utf8_lossy(bytes)),
        }
    }

    /// Decode one frame, reporting why it is malformed
    pub fn try_decode(&self, bytes: &[u8]) -> Result<Event, CodecError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let mut envelope = match value {
            Value::Object(map) => map,
            other => return Err(CodecError::NotAnObject(json_type_name(&other))),
        };

        let payload = match envelope.remove("event") {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => Map::new(),
            Some(other) => return Err(CodecError::InvalidPayload(json_type_name(&other))),
        };

        let kind = discriminator(&envelope)?;

        let event_type = payload
            .get("type")
            .or_else(|| envelope.get("type"))
            .and_then(Value::as_str)
            .ok_or(CodecError::MissingType)?
            .to_string();

        Ok(Event::from_parts(kind, event_type, envelope, payload))
    }
}

fn discriminator(envelope: &Map<String, Value>) -> Result<EventKind, CodecError> {
    if let Some(response) = envelope.get("response") {
        let name = response
            .as_str()
            .ok_or(CodecError::InvalidDiscriminator("response"))?;
        return Ok(EventKind::Response(name.to_string()));
    }
    if let Some(request) = envelope.get("request") {
        let name = request
            .as_str()
            .ok_or(CodecError::InvalidDiscriminator("request"))?;
        return Ok(EventKind::Request(name.to_string()));
    }
    Ok(EventKind::Notification)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
