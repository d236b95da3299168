//! In-process connector
//!
//! Pairs a [`MemoryConnector`] with a [`MemoryListener`] playing the backend.
//! Each successful `connect` yields one [`MemoryPeer`] on the listener side;
//! dropping the peer closes that connection. Used by tests and local demos.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::channel::mpsc as frames;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::connector::{Connector, Link, TransportError};

struct Shared {
    refusals: AtomicU32,
    attempts: AtomicUsize,
}

/// Client side of an in-process backend
pub struct MemoryConnector {
    accept: mpsc::UnboundedSender<MemoryPeer>,
    shared: Arc<Shared>,
}

/// Backend side: accepts connections from a [`MemoryConnector`]
pub struct MemoryListener {
    accepted: mpsc::UnboundedReceiver<MemoryPeer>,
    shared: Arc<Shared>,
}

/// Backend end of one connection
pub struct MemoryPeer {
    to_client: frames::UnboundedSender<Result<Vec<u8>, TransportError>>,
    from_client: frames::UnboundedReceiver<Vec<u8>>,
}

/// Create a connected connector/listener pair
pub fn memory_connector() -> (MemoryConnector, MemoryListener) {
    let (accept, accepted) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
        refusals: AtomicU32::new(0),
        attempts: AtomicUsize::new(0),
    });
    (
        MemoryConnector {
            accept,
            shared: shared.clone(),
        },
        MemoryListener { accepted, shared },
    )
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Link, TransportError> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);

        let refused = self
            .shared
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (client_tx, from_client) = frames::unbounded();
        let (to_client, client_rx) = frames::unbounded();

        self.accept
            .send(MemoryPeer {
                to_client,
                from_client,
            })
            .map_err(|_| TransportError::Connect("listener is gone".to_string()))?;

        Ok(Link {
            sink: Box::pin(client_tx.sink_map_err(|_| TransportError::Closed)),
            source: Box::pin(client_rx),
        })
    }

    fn endpoint(&self) -> String {
        "memory://backend".to_string()
    }
}

impl MemoryListener {
    /// Wait for the next client connection
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accepted.recv().await
    }

    /// Refuse the next `count` connection attempts
    pub fn refuse_next(&self, count: u32) {
        self.shared.refusals.store(count, Ordering::SeqCst);
    }

    /// Total connection attempts seen so far, refused ones included
    pub fn attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}

impl MemoryPeer {
    /// Push one frame to the client. Returns false once the client is gone.
    pub fn send(&self, frame: impl Into<Vec<u8>>) -> bool {
        self.to_client.unbounded_send(Ok(frame.into())).is_ok()
    }

    /// Push a JSON document to the client
    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        self.send(value.to_string())
    }

    /// Break the connection with an I/O error
    pub fn fail(self, reason: &str) {
        let _ = self
            .to_client
            .unbounded_send(Err(TransportError::Io(reason.to_string())));
    }

    /// Next frame written by the client, or `None` once it disconnects
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.from_client.next().await
    }

    /// Next client frame parsed as JSON
    pub async fn recv_json(&mut self) -> Option<serde_json::Value> {
        let frame = self.recv().await?;
        serde_json::from_slice(&frame).ok()
    }

    /// Frame already written by the client, without waiting
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.from_client.try_next().ok().flatten()
    }

    /// Close the connection from the backend side
    pub fn close(self) {}
}
