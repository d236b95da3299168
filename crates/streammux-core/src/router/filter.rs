//! Subscription predicates
//!
//! A [`Filter`] is a cheaply cloneable predicate over [`Event`]s. The
//! attribute-equality shorthands cover almost every subscription in the
//! client; arbitrary closures are available through [`Filter::new`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::domain::{Event, EventKind};

type Predicate = dyn Fn(&Event) -> bool + Send + Sync;

/// Predicate deciding which events a subscription receives
#[derive(Clone)]
pub struct Filter {
    predicate: Arc<Predicate>,
    description: Arc<str>,
}

impl Filter {
    /// Wrap an arbitrary predicate
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self::described("custom", predicate)
    }

    fn described<F>(description: impl Into<Arc<str>>, predicate: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            description: description.into(),
        }
    }

    /// Matches every wire event (local events excluded)
    pub fn any() -> Self {
        Self::described("any", |event: &Event| !event.kind().is_local())
    }

    /// `event.attributes[name] == value`
    pub fn match_on_attribute(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        let description = format!("{} == {}", name, value);
        Self::described(description, move |event: &Event| {
            event.attribute(&name) == Some(&value)
        })
    }

    /// Tests the event type (`availableResponse`, `progress`, ...)
    pub fn match_on_type(event_type: impl Into<String>) -> Self {
        let event_type = event_type.into();
        let description = format!("type == {}", event_type);
        Self::described(description, move |event: &Event| {
            event.event_type() == event_type
        })
    }

    /// Tests the protocol discriminator
    pub fn match_on_kind(kind: EventKind) -> Self {
        let description = format!("kind == {}", kind.as_str());
        Self::described(description, move |event: &Event| *event.kind() == kind)
    }

    /// Matches `{ "response": <name>, ... }` envelopes
    pub fn match_on_response(name: impl Into<String>) -> Self {
        Self::match_on_kind(EventKind::Response(name.into()))
    }

    /// Matches the synthetic resume event
    pub fn stream_reopened() -> Self {
        Self::described("stream reopened", Event::is_stream_reopened)
    }

    pub fn and(self, other: Filter) -> Self {
        let description = format!("({} && {})", self.description, other.description);
        Self::described(description, move |event: &Event| {
            self.matches(event) && other.matches(event)
        })
    }

    pub fn or(self, other: Filter) -> Self {
        let description = format!("({} || {})", self.description, other.description);
        Self::described(description, move |event: &Event| {
            self.matches(event) || other.matches(event)
        })
    }

    pub fn matches(&self, event: &Event) -> bool {
        (self.predicate)(event)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Filter").field(&self.description).finish()
    }
}
