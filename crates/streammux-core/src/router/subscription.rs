//! Subscription registry
//!
//! Registration order is preserved. Entries carry an `active` flag so a
//! subscription removed in the middle of a dispatch stops receiving events
//! immediately, even though the dispatcher iterates over a snapshot.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::diagnostics::Diagnostic;
use super::filter::Filter;
use crate::domain::Event;

/// Result returned by subscription handlers
pub type HandlerResult = anyhow::Result<()>;

pub(crate) type Handler = dyn Fn(&Event) -> HandlerResult + Send + Sync;
pub(crate) type DiagnosticHandler = dyn Fn(&Diagnostic) + Send + Sync;

/// Opaque handle returned by `subscribe`, used to cancel the subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) filter: Filter,
    pub(crate) handler: Arc<Handler>,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    next_id: u64,
    subscriptions: Vec<Arc<Subscription>>,
    diagnostics: Vec<(SubscriptionId, Arc<DiagnosticHandler>)>,
}

impl Registry {
    fn allocate_id(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    pub(crate) fn insert(&mut self, filter: Filter, handler: Arc<Handler>) -> SubscriptionId {
        let id = self.allocate_id();
        self.subscriptions.push(Arc::new(Subscription {
            id,
            filter,
            handler,
            active: AtomicBool::new(true),
        }));
        id
    }

    pub(crate) fn insert_diagnostic(&mut self, handler: Arc<DiagnosticHandler>) -> SubscriptionId {
        let id = self.allocate_id();
        self.diagnostics.push((id, handler));
        id
    }

    /// Remove a subscription of either kind. Returns false for unknown ids.
    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        if let Some(index) = self.subscriptions.iter().position(|s| s.id == id) {
            let subscription = self.subscriptions.remove(index);
            subscription.deactivate();
            return true;
        }
        if let Some(index) = self.diagnostics.iter().position(|(d, _)| *d == id) {
            self.diagnostics.remove(index);
            return true;
        }
        false
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Subscription>> {
        self.subscriptions.clone()
    }

    pub(crate) fn diagnostic_snapshot(&self) -> Vec<Arc<DiagnosticHandler>> {
        self.diagnostics.iter().map(|(_, h)| h.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub(crate) fn contains(&self, id: SubscriptionId) -> bool {
        self.subscriptions.iter().any(|s| s.id == id)
            || self.diagnostics.iter().any(|(d, _)| *d == id)
    }
}
