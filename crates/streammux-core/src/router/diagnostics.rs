//! Diagnostic reports
//!
//! Anything the router drops instead of delivering ends up here: frames that
//! failed to decode and handlers that returned an error or panicked.

use super::subscription::SubscriptionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An inbound frame could not be decoded
    Malformed { reason: String, raw: String },
    /// A subscription handler failed; dispatch continued with the next one
    HandlerFailed {
        subscription: SubscriptionId,
        filter: String,
        error: String,
    },
}

impl Diagnostic {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "malformed",
            Self::HandlerFailed { .. } => "handler_failed",
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
