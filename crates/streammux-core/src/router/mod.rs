//! Event Router - Multiplexes one connection across many features
//!
//! The router is the only consumer of the transport's lifecycle channel and
//! the only producer of outbound frames. Features never see the connection;
//! they register predicate-based subscriptions and send commands.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  TransportEvent   ┌──────────────────────────────────────┐
//! │ Transport  │──────────────────►│ EventRouter                          │
//! │            │                   │   decode ─► dispatch (in order)      │
//! │            │◄──────────────────│   send   ◄─ encode                   │
//! └────────────┘   encoded frames  │                                      │
//!                                  │ Subscriptions (registration order):  │
//!                                  │   ├─ NewRelic machine                │
//!                                  │   ├─ AppDynamics machine             │
//!                                  │   └─ diagnostics (decode/handler)    │
//!                                  └──────────────────────────────────────┘
//! ```
//!
//! # Dispatch
//!
//! Every event is offered to each live subscription in registration order and
//! matching handlers run synchronously, one after the other, on the router's
//! task. A handler that errors or panics is reported as a [`Diagnostic`] and
//! dispatch continues. Subscriptions added during a dispatch see the next
//! event, not the current one; subscriptions removed during a dispatch stop
//! receiving immediately.
//!
//! # Correlation
//!
//! `send` returns nothing. Replies are correlated structurally: the caller
//! subscribes to the reply shape (`type`, `subtype`) before or while sending.
//! Two concurrent requests with the same reply shape cannot be told apart.
//!
//! # Usage
//!
//! ```ignore
//! let (router, endpoints) = EventRouter::channel();
//!
//! let id = router.subscribe(Filter::match_on_attribute("subtype", "newrelic"), |event| {
//!     tracing::info!(event_type = event.event_type(), "newrelic event");
//!     Ok(())
//! });
//! router.send(&Command::new("NewRelicRequest", "available"));
//!
//! router.unsubscribe(id);
//! ```

mod diagnostics;
mod filter;
mod stream;
mod subscription;

pub use diagnostics::Diagnostic;
pub use filter::Filter;
pub use stream::EventStream;
pub use subscription::{HandlerResult, SubscriptionId};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use crate::codec::JsonCodec;
use crate::domain::{Command, ConnectionState, Event, TransportEvent};
use diagnostics::panic_message;
use subscription::Registry;

/// Errors surfaced by the router's async helpers
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no reply matching `{filter}` within {timeout:?}")]
    Timeout { filter: String, timeout: Duration },

    #[error("router was dropped before a reply arrived")]
    Closed,
}

/// The transport-facing ends of a router, handed to the transport at startup
pub struct RouterEndpoints {
    /// Encoded outbound frames, in send order
    pub outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    /// Connection state published by the transport
    pub connection: watch::Sender<ConnectionState>,
}

struct RouterInner {
    registry: Mutex<Registry>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    connection: watch::Receiver<ConnectionState>,
    codec: JsonCodec,
}

/// Event Router - the pub/sub multiplexer over the single connection
///
/// Cheap to clone; all clones share one subscription registry and one
/// outbound channel.
#[derive(Clone)]
pub struct EventRouter {
    inner: Arc<RouterInner>,
}

impl EventRouter {
    /// Create a router from its transport-facing channels
    pub fn new(
        outbound: mpsc::UnboundedSender<Vec<u8>>,
        connection: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                registry: Mutex::new(Registry::default()),
                outbound,
                connection,
                codec: JsonCodec::new(),
            }),
        }
    }

    /// Create a router together with the endpoints a transport needs
    pub fn channel() -> (Self, RouterEndpoints) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        (
            Self::new(outbound_tx, state_rx),
            RouterEndpoints {
                outbound: outbound_rx,
                connection: state_tx,
            },
        )
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Register interest in events matching `filter`
    pub fn subscribe<F>(&self, filter: Filter, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> HandlerResult + Send + Sync + 'static,
    {
        let description = filter.description().to_string();
        let id = self.inner.registry.lock().insert(filter, Arc::new(handler));
        debug!(subscription = %id, filter = %description, "[Router] Subscribed");
        id
    }

    /// Register a diagnostic subscription (decode failures, handler failures)
    pub fn subscribe_diagnostics<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        let id = self.inner.registry.lock().insert_diagnostic(Arc::new(handler));
        debug!(subscription = %id, "[Router] Diagnostics subscribed");
        id
    }

    /// Cancel a subscription. Unknown or already-removed ids are a no-op.
    ///
    /// Returns whether something was removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.inner.registry.lock().remove(id);
        if removed {
            debug!(subscription = %id, "[Router] Unsubscribed");
        } else {
            trace!(subscription = %id, "[Router] Unsubscribe of unknown subscription ignored");
        }
        removed
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.inner.registry.lock().contains(id)
    }

    /// Number of live (non-diagnostic) subscriptions
    pub fn subscription_count(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// A derived stream for building narrowed subscriptions
    pub fn stream(&self, filter: Filter) -> EventStream {
        EventStream::new(self.clone(), filter)
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Encode and hand a command to the transport. Never blocks.
    ///
    /// Frames sent while disconnected are queued by the transport.
    pub fn send(&self, command: &Command) {
        let frame = match self.inner.codec.encode(command) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(
                    request = command.request(),
                    command_type = command.command_type(),
                    error = %e,
                    "[Router] Failed to encode command"
                );
                return;
            }
        };

        if self.inner.outbound.send(frame).is_err() {
            warn!(
                request = command.request(),
                command_type = command.command_type(),
                "[Router] Transport is gone, command dropped"
            );
        } else {
            debug!(
                request = command.request(),
                command_type = command.command_type(),
                "[Router] Sent command"
            );
        }
    }

    /// Send `command` and wait for the first event matching `reply`.
    ///
    /// The reply subscription is registered before sending and always removed
    /// afterwards. The router imposes no timeout of its own; the caller
    /// chooses one here.
    pub async fn request(
        &self,
        command: &Command,
        reply: Filter,
        timeout: Duration,
    ) -> Result<Event, RouterError> {
        let description = reply.description().to_string();
        let (tx, rx) = oneshot::channel();
        let slot = Mutex::new(Some(tx));

        let id = self.subscribe(reply, move |event| {
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(event.clone());
            }
            Ok(())
        });

        self.send(command);
        let outcome = tokio::time::timeout(timeout, rx).await;
        self.unsubscribe(id);

        match outcome {
            Ok(Ok(event)) => Ok(event),
            Ok(Err(_)) => Err(RouterError::Closed),
            Err(_) => Err(RouterError::Timeout {
                filter: description,
                timeout,
            }),
        }
    }

    // =========================================================================
    // Connection state (read-only)
    // =========================================================================

    pub fn connection_state(&self) -> ConnectionState {
        *self.inner.connection.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    /// Watch connection state changes
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.clone()
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Consume transport lifecycle events until the transport goes away
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        info!("[Router] Dispatch loop started");
        while let Some(event) = events.recv().await {
            self.handle_transport_event(event);
        }
        info!("[Router] Transport channel closed, dispatch loop stopped");
    }

    /// Process one lifecycle notification
    pub fn handle_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Opened { resumed } => {
                info!(resumed, "[Router] Stream opened");
                if resumed {
                    self.dispatch(&Event::stream_reopened());
                }
            }
            TransportEvent::Closed { reason } => {
                warn!(reason = %reason, "[Router] Stream closed");
            }
            TransportEvent::Message(bytes) => {
                let event = self.inner.codec.decode(&bytes);
                self.dispatch(&event);
            }
        }
    }

    /// Deliver one event to every matching subscription.
    ///
    /// Decode errors only go to diagnostic subscriptions. Returns the number
    /// of handlers that completed successfully.
    pub fn dispatch(&self, event: &Event) -> usize {
        if event.is_decode_error() {
            let reason = event.str_attr("reason").unwrap_or_default().to_string();
            let raw = event.str_attr("raw").unwrap_or_default().to_string();
            warn!(reason = %reason, bytes = raw.len(), "[Router] Dropping malformed frame");
            self.report(Diagnostic::Malformed { reason, raw });
            return 0;
        }

        let snapshot = self.inner.registry.lock().snapshot();
        let mut delivered = 0;

        for subscription in snapshot {
            if !subscription.is_active() {
                continue;
            }

            let outcome = catch_unwind(AssertUnwindSafe(|| {
                if subscription.filter.matches(event) {
                    Some((subscription.handler)(event))
                } else {
                    None
                }
            }));

            let error = match outcome {
                Ok(None) => continue,
                Ok(Some(Ok(()))) => {
                    delivered += 1;
                    continue;
                }
                Ok(Some(Err(e))) => format!("{:#}", e),
                Err(payload) => panic_message(payload.as_ref()),
            };

            warn!(
                subscription = %subscription.id,
                event_type = event.event_type(),
                error = %error,
                "[Router] Handler failed"
            );
            self.report(Diagnostic::HandlerFailed {
                subscription: subscription.id,
                filter: subscription.filter.description().to_string(),
                error,
            });
        }

        trace!(
            event_type = event.event_type(),
            kind = event.kind().as_str(),
            delivered,
            "[Router] Dispatched event"
        );
        delivered
    }

    fn report(&self, diagnostic: Diagnostic) {
        let handlers = self.inner.registry.lock().diagnostic_snapshot();
        for handler in handlers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(&diagnostic))) {
                warn!(
                    error = %panic_message(payload.as_ref()),
                    "[Router] Diagnostic handler panicked"
                );
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
