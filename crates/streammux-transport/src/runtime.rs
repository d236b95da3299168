//! Stream runtime
//!
//! Wires one [`Transport`] to one [`EventRouter`] and runs both as tasks.
//! Features get the router and never touch the transport.

use std::sync::Arc;

use anyhow::Context;
use streammux_core::{ClientConfig, EventRouter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::connector::Connector;
use crate::transport::Transport;
use crate::websocket::WebSocketConnector;

pub struct StreamRuntime {
    router: EventRouter,
    shutdown: CancellationToken,
    transport_task: JoinHandle<()>,
    router_task: JoinHandle<()>,
}

impl StreamRuntime {
    /// Connect to `config.url` over WebSocket
    pub fn connect(config: &ClientConfig) -> anyhow::Result<Self> {
        let connector = WebSocketConnector::new(&config.url)
            .with_context(|| format!("Invalid stream url '{}'", config.url))?;
        Self::start(config, Arc::new(connector))
    }

    /// Start the transport and router tasks over any connector.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &ClientConfig, connector: Arc<dyn Connector>) -> anyhow::Result<Self> {
        config.validate().context("Invalid client configuration")?;

        let (router, endpoints) = EventRouter::channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transport = Transport::new(connector, config, endpoints, events_tx);
        let shutdown = CancellationToken::new();

        let transport_task = tokio::spawn(transport.run(shutdown.clone()));
        let router_task = tokio::spawn(router.clone().run(events_rx));

        info!(url = %config.url, "[Runtime] Stream runtime started");
        Ok(Self {
            router,
            shutdown,
            transport_task,
            router_task,
        })
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Token cancelled when the runtime shuts down
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop the transport and wait for the router to drain
    pub async fn shutdown(self) {
        info!("[Runtime] Shutting down");
        self.shutdown.cancel();
        let _ = self.transport_task.await;
        // The router loop ends once the transport drops its event sender
        let _ = self.router_task.await;
        info!("[Runtime] Stopped");
    }
}
