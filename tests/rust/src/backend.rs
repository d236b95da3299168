use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use streammux_core::{ClientConfig, EventRouter};
use streammux_transport::{memory_connector, MemoryListener, MemoryPeer, StreamRuntime};

use crate::async_helpers::{with_timeout, DEFAULT_TIMEOUT};
use crate::fixtures::test_config;

/// A running runtime talking to an in-process backend
pub struct TestBackend {
    runtime: StreamRuntime,
    listener: MemoryListener,
}

impl TestBackend {
    pub fn start() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let (connector, listener) = memory_connector();
        let runtime =
            StreamRuntime::start(&config, Arc::new(connector)).expect("Failed to start runtime");
        Self { runtime, listener }
    }

    pub fn router(&self) -> EventRouter {
        self.runtime.router().clone()
    }

    pub fn listener(&self) -> &MemoryListener {
        &self.listener
    }

    /// Wait for the client to connect
    pub async fn accept(&mut self) -> MemoryPeer {
        with_timeout(DEFAULT_TIMEOUT, self.listener.accept())
            .await
            .expect("Connector was dropped")
    }

    pub async fn shutdown(self) {
        with_timeout(DEFAULT_TIMEOUT, self.runtime.shutdown()).await;
    }
}

/// Next frame the client wrote, parsed as JSON
pub async fn next_frame(peer: &mut MemoryPeer) -> Value {
    with_timeout(DEFAULT_TIMEOUT, peer.recv_json())
        .await
        .expect("Client disconnected")
}

/// `type` of the next frame the client wrote
pub async fn next_type(peer: &mut MemoryPeer) -> String {
    next_frame(peer).await["type"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

/// Assert the client writes nothing for `duration`
pub async fn expect_silence(peer: &mut MemoryPeer, duration: Duration) {
    if let Ok(Some(frame)) = tokio::time::timeout(duration, peer.recv()).await {
        panic!("unexpected frame: {}", String::from_utf8_lossy(&frame));
    }
}
