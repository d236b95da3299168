//! Correlation helpers
//!
//! An [`EventStream`] is a router plus an accumulated filter. Narrowing a
//! stream never touches the router; only `subscribe` registers anything.
//!
//! ```ignore
//! let monitoring = router.stream(Filter::match_on_attribute("type", "monitoring"));
//! let appdynamics = monitoring.match_on_attribute("subtype", "appdynamics");
//! let id = appdynamics.subscribe(|event| { /* ... */ Ok(()) });
//! ```

use serde_json::Value;

use super::filter::Filter;
use super::subscription::{HandlerResult, SubscriptionId};
use super::EventRouter;
use crate::domain::Event;

/// A filtered view of the router's event stream
#[derive(Clone)]
pub struct EventStream {
    router: EventRouter,
    filter: Filter,
}

impl EventStream {
    pub(crate) fn new(router: EventRouter, filter: Filter) -> Self {
        Self { router, filter }
    }

    /// Narrow to events whose attribute `name` equals `value`
    pub fn match_on_attribute(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.narrow(Filter::match_on_attribute(name, value))
    }

    /// Narrow to events of one type
    pub fn match_on_type(&self, event_type: impl Into<String>) -> Self {
        self.narrow(Filter::match_on_type(event_type))
    }

    /// Narrow with an arbitrary filter
    pub fn narrow(&self, filter: Filter) -> Self {
        Self {
            router: self.router.clone(),
            filter: self.filter.clone().and(filter),
        }
    }

    /// Widen to also accept events matching `filter`
    pub fn or(&self, filter: Filter) -> Self {
        Self {
            router: self.router.clone(),
            filter: self.filter.clone().or(filter),
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Register a handler for this stream
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> HandlerResult + Send + Sync + 'static,
    {
        self.router.subscribe(self.filter.clone(), handler)
    }
}
