//! StreamMux CLI
//!
//! Connects to the backend stream, starts the monitoring controllers and logs
//! every connection and provisioning change until interrupted.

mod config;
mod logging;

use std::sync::Arc;

use anyhow::Context;
use streammux_core::{ConnectionState, Diagnostic, Settings};
use streammux_monitoring::{AppDynamicsController, NewRelicController, ProvisioningView};
use streammux_storage::{Database, SqliteSettingsStore};
use streammux_transport::StreamRuntime;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use config::EnvConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (for development)
    dotenvy::dotenv().ok();

    let config = EnvConfig::from_env()?;
    let _guard = logging::init_tracing(&config.logs_dir());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        url = %config.client.url,
        data_dir = ?config.data_dir,
        "[Cli] Starting StreamMux"
    );

    let db = Database::open(&config.database_path()).context("Failed to open settings database")?;
    let settings = Settings::new(Arc::new(SqliteSettingsStore::new(Arc::new(Mutex::new(db)))));

    let runtime = StreamRuntime::connect(&config.client)?;
    let router = runtime.router().clone();
    router.subscribe_diagnostics(log_diagnostic);

    let timeout = config.client.provision_timeout();
    let newrelic = NewRelicController::new(router.clone(), &settings, timeout).await?;
    let appdynamics = AppDynamicsController::new(router.clone(), &settings, timeout).await?;
    newrelic.start();
    appdynamics.start();

    let mut connection = router.watch_connection();
    let mut newrelic_view = newrelic.watch();
    let mut appdynamics_view = appdynamics.watch();

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "[Cli] Failed to listen for ctrl-c");
                }
                break;
            }
            changed = connection.changed() => {
                if changed.is_err() {
                    break;
                }
                log_connection(*connection.borrow_and_update());
            }
            changed = newrelic_view.changed() => {
                if changed.is_ok() {
                    log_view(&newrelic_view);
                }
            }
            changed = appdynamics_view.changed() => {
                if changed.is_ok() {
                    log_view(&appdynamics_view);
                }
            }
        }
    }

    drop(newrelic);
    drop(appdynamics);
    runtime.shutdown().await;
    Ok(())
}

fn log_connection(state: ConnectionState) {
    match state {
        ConnectionState::Connected => info!("[Cli] Connected to backend"),
        ConnectionState::Reconnecting => warn!("[Cli] Backend connection lost, reconnecting"),
        other => info!(state = other.as_str(), "[Cli] Connection state"),
    }
}

fn log_view(view: &watch::Receiver<ProvisioningView>) {
    let view = view.borrow().clone();
    match serde_json::to_string(&view) {
        Ok(json) => info!(integration = view.integration, state = %view.state, view = %json, "[Cli] Provisioning update"),
        Err(e) => warn!(error = %e, "[Cli] Failed to render provisioning view"),
    }
}

fn log_diagnostic(diagnostic: &Diagnostic) {
    match diagnostic {
        Diagnostic::Malformed { reason, .. } => {
            warn!(reason = %reason, "[Cli] Backend sent a malformed frame")
        }
        Diagnostic::HandlerFailed {
            subscription,
            filter,
            error,
        } => warn!(%subscription, filter = %filter, error = %error, "[Cli] Event handler failed"),
    }
}
