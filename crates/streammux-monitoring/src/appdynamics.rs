//! AppDynamics controller
//!
//! Persists the agent configuration (node, tier, controller host, account)
//! and drives the download of the agent with per-call credentials.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use streammux_core::{keys, EventRouter, Setting, Settings, SettingsBatch, ValidationReport};
use tokio::sync::watch;
use tracing::info;

use crate::error::ProvisioningError;
use crate::integration::{AppDynamics, Integration};
use crate::machine::ProvisioningMachine;
use crate::rules;
use crate::session::{ProvisioningState, ProvisioningView};

pub const DEFAULT_TIER_NAME: &str = "development";
pub const DEFAULT_PORT: u32 = 443;

/// AppDynamics agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDynamicsConfig {
    pub node_name: String,
    pub tier_name: String,
    pub host_name: String,
    pub port: u32,
    pub ssl_enabled: bool,
    pub account_name: String,
    pub access_key: String,
}

impl Default for AppDynamicsConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            tier_name: DEFAULT_TIER_NAME.to_string(),
            host_name: String::new(),
            port: DEFAULT_PORT,
            ssl_enabled: true,
            account_name: String::new(),
            access_key: String::new(),
        }
    }
}

impl AppDynamicsConfig {
    pub fn validate(&self) -> ValidationReport {
        ValidationReport::new()
            .check(&rules::NODE_NAME, &self.node_name)
            .check(&rules::TIER_NAME, &self.tier_name)
            .check(&rules::HOST_NAME, &self.host_name)
            .check(&rules::PORT, &self.port.to_string())
            .check(&rules::ACCOUNT_NAME, &self.account_name)
            .check(&rules::ACCESS_KEY, &self.access_key)
    }
}

/// `activator-<unix millis>`
fn default_node_name() -> String {
    format!("activator-{}", chrono::Utc::now().timestamp_millis())
}

struct ConfigSettings {
    settings: Settings,
    node_name: Setting<String>,
    tier_name: Setting<String>,
    host_name: Setting<String>,
    port: Setting<u32>,
    ssl_enabled: Setting<bool>,
    account_name: Setting<String>,
    access_key: Setting<String>,
}

impl ConfigSettings {
    async fn load(settings: &Settings) -> anyhow::Result<Self> {
        let defaults = AppDynamicsConfig::default();
        Ok(Self {
            settings: settings.clone(),
            node_name: settings
                .observable(keys::appdynamics::NODE_NAME, defaults.node_name)
                .await?,
            tier_name: settings
                .observable(keys::appdynamics::TIER_NAME, defaults.tier_name)
                .await?,
            host_name: settings
                .observable(keys::appdynamics::HOST_NAME, defaults.host_name)
                .await?,
            port: settings
                .observable(keys::appdynamics::PORT, defaults.port)
                .await?,
            ssl_enabled: settings
                .observable(keys::appdynamics::SSL_ENABLED, defaults.ssl_enabled)
                .await?,
            account_name: settings
                .observable(keys::appdynamics::ACCOUNT_NAME, defaults.account_name)
                .await?,
            access_key: settings
                .observable(keys::appdynamics::ACCESS_KEY, defaults.access_key)
                .await?,
        })
    }

    fn current(&self) -> AppDynamicsConfig {
        AppDynamicsConfig {
            node_name: self.node_name.get(),
            tier_name: self.tier_name.get(),
            host_name: self.host_name.get(),
            port: self.port.get(),
            ssl_enabled: self.ssl_enabled.get(),
            account_name: self.account_name.get(),
            access_key: self.access_key.get(),
        }
    }

    /// Persist every field in one write
    async fn store(&self, config: &AppDynamicsConfig) -> anyhow::Result<()> {
        let batch = SettingsBatch::new()
            .set(keys::appdynamics::NODE_NAME, &config.node_name)?
            .set(keys::appdynamics::TIER_NAME, &config.tier_name)?
            .set(keys::appdynamics::HOST_NAME, &config.host_name)?
            .set(keys::appdynamics::PORT, &config.port)?
            .set(keys::appdynamics::SSL_ENABLED, &config.ssl_enabled)?
            .set(keys::appdynamics::ACCOUNT_NAME, &config.account_name)?
            .set(keys::appdynamics::ACCESS_KEY, &config.access_key)?;
        self.settings.set_all(batch).await
    }
}

pub struct AppDynamicsController {
    machine: ProvisioningMachine<AppDynamics>,
    config: ConfigSettings,
}

impl AppDynamicsController {
    /// Load the stored configuration and build an idle controller
    pub async fn new(
        router: EventRouter,
        settings: &Settings,
        provision_timeout: Option<Duration>,
    ) -> anyhow::Result<Self> {
        let config = ConfigSettings::load(settings).await?;
        let machine = ProvisioningMachine::new(AppDynamics, router, provision_timeout);
        machine.record_config(config.current().validate());
        Ok(Self { machine, config })
    }

    /// Subscribe and issue the initial queries
    pub fn start(&self) {
        self.machine.start();
    }

    pub fn machine(&self) -> &ProvisioningMachine<AppDynamics> {
        &self.machine
    }

    pub fn view(&self) -> ProvisioningView {
        self.machine.view()
    }

    pub fn watch(&self) -> watch::Receiver<ProvisioningView> {
        self.machine.watch()
    }

    pub fn state(&self) -> ProvisioningState {
        self.machine.state()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn config(&self) -> AppDynamicsConfig {
        self.config.current()
    }

    /// Whether every configured field passes its rule
    pub fn configured(&self) -> bool {
        self.config.current().validate().is_valid()
    }

    /// Validate `config` and persist it when every field passes.
    ///
    /// A rejected configuration is not stored: the error lists its failing
    /// fields and the view keeps describing the saved configuration.
    pub async fn configure(&self, config: AppDynamicsConfig) -> Result<(), ProvisioningError> {
        config.validate().into_result()?;
        let stored = self.config.store(&config).await;
        self.machine.record_config(self.config.current().validate());
        stored?;
        info!("[Provisioning] AppDynamics configuration saved");
        Ok(())
    }

    /// Clear the stored account credentials and return to `Idle`
    pub async fn reset_credentials(&self) -> Result<(), ProvisioningError> {
        self.config.account_name.reset().await?;
        self.config.access_key.reset().await?;
        self.machine.reset();
        self.machine.record_config(self.config.current().validate());
        info!("[Provisioning] AppDynamics credentials reset");
        Ok(())
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub fn check_availability(&self) -> Result<(), ProvisioningError> {
        self.machine.check_availability()
    }

    /// Download the agent using the given AppDynamics account credentials
    pub fn provision(&self, username: &str, password: &str) -> Result<(), ProvisioningError> {
        self.machine.provision(Self::provision_command(username, password)?)
    }

    pub fn retry(&self, username: &str, password: &str) -> Result<(), ProvisioningError> {
        self.machine.retry(Self::provision_command(username, password)?)
    }

    fn provision_command(
        username: &str,
        password: &str,
    ) -> Result<streammux_core::Command, ProvisioningError> {
        ValidationReport::new()
            .check(&rules::USERNAME, username)
            .check(&rules::PASSWORD, password)
            .into_result()?;
        Ok(AppDynamics
            .command("provision")
            .with("username", username)
            .with("password", password))
    }

    /// Remove the downloaded agent. Not allowed while provisioning.
    pub fn deprovision(&self) -> Result<(), ProvisioningError> {
        let state = self.machine.state();
        if state.is_in_flight() {
            return Err(ProvisioningError::InvalidTransition {
                integration: AppDynamics.name(),
                action: "deprovision",
                state,
            });
        }
        self.machine.send(&AppDynamics.command("deprovision"));
        Ok(())
    }

    pub fn reset(&self) {
        self.machine.reset();
    }

    pub fn check_project_enabled(&self) {
        self.machine.send(&AppDynamics.command("isProjectEnabled"));
    }

    /// Write the agent configuration into the project at `location`
    pub fn enable_project(&self, location: &str) -> Result<(), ProvisioningError> {
        let config = self.config.current();
        config.validate().into_result()?;

        self.machine.set_project_enabled(true);
        self.machine.send(
            &AppDynamics
                .command("generateFiles")
                .with("location", location)
                .with("applicationName", "n/a")
                .with("nodeName", config.node_name)
                .with("tierName", config.tier_name)
                .with("accountName", config.account_name)
                .with("accessKey", config.access_key)
                .with("hostName", config.host_name)
                .with("port", config.port)
                .with("sslEnabled", config.ssl_enabled),
        );
        Ok(())
    }
}
