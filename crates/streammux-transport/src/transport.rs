//! Reconnecting transport
//!
//! Holds at most one physical link at a time. On loss it publishes
//! `Reconnecting`, waits out the backoff and tries again until shut down.

use std::fmt;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use streammux_core::{BackoffPolicy, ClientConfig, ConnectionState, RouterEndpoints, TransportEvent};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connector::{Connector, Link, TransportError};
use crate::queue::{Hold, OutboundQueue};

/// Why a link stopped pumping
enum CloseReason {
    Shutdown,
    SendersGone,
    RemoteClosed,
    Failed(TransportError),
}

impl CloseReason {
    fn is_final(&self) -> bool {
        matches!(self, Self::Shutdown | Self::SendersGone)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => write!(f, "shutdown"),
            Self::SendersGone => write!(f, "router dropped"),
            Self::RemoteClosed => write!(f, "closed by remote"),
            Self::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// The single physical connection and its retry loop
pub struct Transport {
    connector: Arc<dyn Connector>,
    backoff: BackoffPolicy,
    queue: OutboundQueue,
    state: watch::Sender<ConnectionState>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl Transport {
    /// Build a transport feeding `events` and draining the router's outbound
    /// frames from `endpoints`
    pub fn new(
        connector: Arc<dyn Connector>,
        config: &ClientConfig,
        endpoints: RouterEndpoints,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            connector,
            backoff: config.backoff.clone(),
            queue: OutboundQueue::new(endpoints.outbound, config.outbound_queue_capacity),
            state: endpoints.connection,
            events,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Connect, pump and reconnect until `shutdown` fires or the router is
    /// dropped. Ends in `Disconnected`.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let endpoint = self.connector.endpoint();
        info!(endpoint = %endpoint, "[Transport] Starting");

        let mut attempt: u32 = 0;
        let mut opened_before = false;
        self.set_state(ConnectionState::Connecting);

        loop {
            let connector = self.connector.clone();
            let link = match self.queue.hold_until(connector.connect(), &shutdown).await {
                Hold::Ready(Ok(link)) => Some(link),
                Hold::Ready(Err(e)) => {
                    warn!(endpoint = %endpoint, attempt, error = %e, "[Transport] Connect failed");
                    None
                }
                Hold::Shutdown | Hold::SendersGone => break,
            };

            if let Some(link) = link {
                attempt = 0;
                let resumed = opened_before;
                opened_before = true;

                self.set_state(ConnectionState::Connected);
                info!(endpoint = %endpoint, resumed, queued = self.queue.len(), "[Transport] Connected");
                self.emit(TransportEvent::Opened { resumed });

                let reason = self.pump(link, &shutdown).await;
                self.emit(TransportEvent::Closed {
                    reason: reason.to_string(),
                });
                if reason.is_final() {
                    break;
                }
                warn!(endpoint = %endpoint, reason = %reason, "[Transport] Connection lost");
            }

            self.set_state(ConnectionState::Reconnecting);
            let delay = self.backoff.delay(attempt);
            attempt = attempt.saturating_add(1);
            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "[Transport] Waiting before reconnect"
            );

            match self.queue.hold_until(tokio::time::sleep(delay), &shutdown).await {
                Hold::Ready(()) => {}
                Hold::Shutdown | Hold::SendersGone => break,
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!(
            endpoint = %endpoint,
            unsent = self.queue.len(),
            dropped = self.queue.dropped(),
            "[Transport] Stopped"
        );
    }

    /// Flush buffered frames, then move frames both ways until the link ends
    async fn pump(&mut self, link: Link, shutdown: &CancellationToken) -> CloseReason {
        let Link {
            mut sink,
            mut source,
        } = link;

        while let Some(frame) = self.queue.pop_front() {
            if let Err(e) = sink.send(frame.clone()).await {
                self.queue.push_front(frame);
                return CloseReason::Failed(e);
            }
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = sink.close().await;
                    return CloseReason::Shutdown;
                }
                frame = self.queue.rx.recv() => match frame {
                    Some(frame) => {
                        if let Err(e) = sink.send(frame.clone()).await {
                            self.queue.push_back(frame);
                            return CloseReason::Failed(e);
                        }
                    }
                    None => {
                        let _ = sink.close().await;
                        return CloseReason::SendersGone;
                    }
                },
                inbound = source.next() => match inbound {
                    Some(Ok(bytes)) => self.emit(TransportEvent::Message(bytes)),
                    Some(Err(TransportError::Closed)) | None => return CloseReason::RemoteClosed,
                    Some(Err(e)) => return CloseReason::Failed(e),
                },
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = previous.as_str(), to = state.as_str(), "[Transport] State changed");
        }
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            debug!("[Transport] Router loop is gone, event dropped");
        }
    }
}
