//! Persisted settings
//!
//! The settings store is an external collaborator: anything that can keep
//! string values under dotted keys. [`Settings`] layers typed access and
//! observable cells on top of it.

mod memory;
mod service;

pub use memory::MemorySettingsStore;
pub use service::{Setting, Settings, SettingsBatch};

use async_trait::async_trait;

/// Key-value persistence for settings
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Get a raw value
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Insert or replace a raw value
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Insert or replace several values as one write: either all of them
    /// land or none do.
    ///
    /// The default writes one key at a time and is only atomic for stores
    /// that cannot fail part-way.
    async fn set_all(&self, entries: &[(String, String)]) -> anyhow::Result<()> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    /// Remove a value. Missing keys are not an error.
    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// All stored pairs, ordered by key
    async fn list(&self) -> anyhow::Result<Vec<(String, String)>>;
}

// =============================================================================
// Setting Keys (centralized constants)
// =============================================================================

/// Setting key constants.
pub mod keys {
    /// New Relic namespace
    pub mod newrelic {
        /// Account license key (40 alphanumerics)
        pub const LICENSE_KEY: &str = "newrelic.licenseKey";
    }

    /// AppDynamics namespace
    pub mod appdynamics {
        pub const NODE_NAME: &str = "appDynamics.nodeName";
        pub const TIER_NAME: &str = "appDynamics.tierName";
        pub const HOST_NAME: &str = "appDynamics.hostName";
        /// Controller port
        pub const PORT: &str = "appDynamics.port";
        /// Use SSL towards the controller (bool)
        pub const SSL_ENABLED: &str = "appDynamics.sslEnabled";
        pub const ACCOUNT_NAME: &str = "appDynamics.accountName";
        pub const ACCESS_KEY: &str = "appDynamics.accessKey";
    }
}
