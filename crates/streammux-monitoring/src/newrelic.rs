//! New Relic controller
//!
//! Binds the persisted license key to a provisioning machine and exposes the
//! integration's extra queries (project enabled, supported Java version).

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use streammux_core::{
    keys, EventRouter, Filter, Setting, Settings, SubscriptionId, ValidationReport,
};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::ProvisioningError;
use crate::integration::{Integration, NewRelic};
use crate::machine::ProvisioningMachine;
use crate::rules;
use crate::session::{ProvisioningState, ProvisioningView};

/// Whether the project's Java version can run the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaSupport {
    pub result: bool,
    pub version: String,
}

impl Default for JavaSupport {
    fn default() -> Self {
        Self {
            result: true,
            version: "Unknown".to_string(),
        }
    }
}

pub struct NewRelicController {
    machine: ProvisioningMachine<NewRelic>,
    license_key: Setting<String>,
    java: Arc<watch::Sender<JavaSupport>>,
    java_subscription: parking_lot::Mutex<Option<SubscriptionId>>,
}

impl NewRelicController {
    /// Load the stored license key and build an idle controller
    pub async fn new(
        router: EventRouter,
        settings: &Settings,
        provision_timeout: Option<Duration>,
    ) -> anyhow::Result<Self> {
        let license_key = settings
            .observable(keys::newrelic::LICENSE_KEY, String::new())
            .await?;
        let machine = ProvisioningMachine::new(NewRelic, router, provision_timeout);
        let controller = Self {
            machine,
            license_key,
            java: Arc::new(watch::channel(JavaSupport::default()).0),
            java_subscription: parking_lot::Mutex::new(None),
        };
        // A stored key that no longer passes simply shows as unsaved
        controller.machine.record_config(Self::validate(&controller.license_key.get()));
        Ok(controller)
    }

    fn validate(key: &str) -> ValidationReport {
        ValidationReport::new().check(&rules::LICENSE_KEY, key)
    }

    /// Subscribe and issue the initial queries
    pub fn start(&self) {
        let mut java_subscription = self.java_subscription.lock();
        if java_subscription.is_none() {
            let java = self.java.clone();
            let filter = NewRelic
                .events()
                .and(Filter::match_on_type("isSupportedJavaVersionResult"));
            *java_subscription = Some(self.machine.router().subscribe(filter, move |event| {
                let support = JavaSupport {
                    result: event.bool_attr("result").unwrap_or(false),
                    version: event.str_attr("version").unwrap_or("Unknown").to_string(),
                };
                debug!(result = support.result, version = %support.version, "[Provisioning] New Relic Java support");
                java.send_replace(support);
                Ok(())
            }));
        }
        drop(java_subscription);
        self.machine.start();
    }

    pub fn machine(&self) -> &ProvisioningMachine<NewRelic> {
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
    // License key
    // =========================================================================

    pub fn license_key(&self) -> String {
        self.license_key.get()
    }

    pub fn license_key_saved(&self) -> bool {
        rules::LICENSE_KEY.test(&self.license_key.get())
    }

    /// Validate `key` and persist it when it passes.
    ///
    /// A rejected key leaves the saved one, and the view, untouched.
    pub async fn set_license_key(&self, key: &str) -> Result<(), ProvisioningError> {
        Self::validate(key).into_result()?;
        let stored = self.license_key.set(key.to_string()).await;
        self.machine.record_config(Self::validate(&self.license_key.get()));
        stored?;
        info!("[Provisioning] New Relic license key saved");
        Ok(())
    }

    /// Clear the stored key and return the machine to `Idle`
    pub async fn reset_key(&self) -> Result<(), ProvisioningError> {
        self.license_key.reset().await?;
        self.machine.reset();
        self.machine.record_config(Self::validate(&self.license_key.get()));
        info!("[Provisioning] New Relic license key reset");
        Ok(())
    }

    // =========================================================================
    // Commands
    // =========================================================================

    pub fn check_availability(&self) -> Result<(), ProvisioningError> {
        self.machine.check_availability()
    }

    /// Download and install the agent
    pub fn provision(&self) -> Result<(), ProvisioningError> {
        self.machine.provision(NewRelic.command("provision"))
    }

    pub fn retry(&self) -> Result<(), ProvisioningError> {
        self.machine.retry(NewRelic.command("provision"))
    }

    pub fn reset(&self) {
        self.machine.reset();
    }

    pub fn check_project_enabled(&self) {
        self.machine.send(&NewRelic.command("isProjectEnabled"));
    }

    pub fn check_supported_java_version(&self) {
        self.machine.send(&NewRelic.command("isSupportedJavaVersion"));
    }

    pub fn supported_java_version(&self) -> JavaSupport {
        self.java.borrow().clone()
    }

    /// Enable the agent for `app_name` with the stored license key
    pub fn enable_project(&self, app_name: &str) -> Result<(), ProvisioningError> {
        let key = self.license_key.get();
        Self::validate(&key).into_result()?;
        self.machine.send(
            &NewRelic
                .command("enable")
                .with("key", key)
                .with("name", app_name),
        );
        Ok(())
    }

    /// Ask the backend to write the agent configuration for `location`
    pub fn generate_files(&self, location: &str) {
        self.machine.send(
            &NewRelic
                .command("generateFiles")
                .with("location", location)
                .with("info", ""),
        );
    }
}

impl Drop for NewRelicController {
    fn drop(&mut self) {
        if let Some(id) = self.java_subscription.get_mut().take() {
            self.machine.router().unsubscribe(id);
        }
    }
}
