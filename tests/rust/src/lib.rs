//! Shared test utilities and fixtures for StreamMux integration tests.

pub use streammux_core::{Command, Event, EventKind, EventRouter, Filter};
pub use streammux_transport::MemoryPeer;

/// In-process backend wired to a running stream runtime
pub mod backend;
pub use backend::TestBackend;

/// Handlers that record what they receive
pub mod recording;
pub use recording::{DiagnosticRecorder, Recorder};

/// Wire frame fixtures, as the backend sends them
pub mod frames {
    use serde_json::{json, Value};

    /// `{ response, type: "monitoring", subtype, event }`
    pub fn monitoring(subtype: &str, event: Value) -> Value {
        json!({
            "response": "MonitoringResponse",
            "type": "monitoring",
            "subtype": subtype,
            "event": event,
        })
    }

    /// `availableResponse` for one integration
    pub fn available(subtype: &str, result: bool) -> Value {
        monitoring(subtype, json!({ "type": "availableResponse", "result": result }))
    }

    /// AppDynamics reply in its own response envelope, with no `type`
    pub fn appdynamics_response(event: Value) -> Value {
        json!({
            "response": "AppDynamicsResponse",
            "subtype": "appdynamics",
            "event": event,
        })
    }

    /// Provisioning status event
    pub fn status(event: Value) -> Value {
        json!({
            "response": "ProvisioningStatus",
            "type": "monitoring",
            "subtype": "ProvisioningStatus",
            "event": event,
        })
    }

    pub fn progress_percent(percent: f64) -> Value {
        status(json!({ "type": "progress", "percent": percent }))
    }

    /// Legacy New Relic envelope without a nested event
    pub fn legacy_newrelic(event_type: &str, result: bool) -> Value {
        json!({ "response": "NewRelicResponse", "type": event_type, "result": result })
    }
}

/// Test fixture utilities
pub mod fixtures {
    use std::sync::Arc;
    use std::time::Duration;

    use streammux_core::{BackoffPolicy, ClientConfig, MemorySettingsStore, Settings};
    use streammux_monitoring::AppDynamicsConfig;

    /// Client config with a short fixed reconnect delay
    pub fn test_config() -> ClientConfig {
        ClientConfig::default().with_backoff(BackoffPolicy::fixed(Duration::from_millis(10)))
    }

    /// Settings over an empty in-memory store
    pub fn memory_settings() -> Settings {
        Settings::new(Arc::new(MemorySettingsStore::new()))
    }

    pub fn valid_license_key() -> String {
        "0123456789abcdef0123456789ABCDEF01234567".to_string()
    }

    pub fn valid_appdynamics_config() -> AppDynamicsConfig {
        AppDynamicsConfig {
            node_name: "activator-test".to_string(),
            tier_name: "development".to_string(),
            host_name: "controller.example.com".to_string(),
            port: 443,
            ssl_enabled: true,
            account_name: "customer1".to_string(),
            access_key: "abc123def456".to_string(),
        }
    }
}

/// Database test helpers
pub mod db {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use streammux_storage::{Database, SqliteSettingsStore};
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    /// A database file in a temporary directory
    pub struct TestDatabase {
        _temp_dir: TempDir,
        db_path: PathBuf,
    }

    impl TestDatabase {
        pub fn new() -> Self {
            let temp_dir = TempDir::new().expect("Failed to create temp dir");
            let db_path = streammux_storage::database_path(temp_dir.path());
            Self {
                _temp_dir: temp_dir,
                db_path,
            }
        }

        /// Get the full database file path
        pub fn db_path(&self) -> &Path {
            &self.db_path
        }

        /// Open (or reopen) the database
        pub fn open(&self) -> Database {
            Database::open(&self.db_path).expect("Failed to open test database")
        }

        /// A settings store over a fresh connection to this database
        pub fn settings_store(&self) -> SqliteSettingsStore {
            SqliteSettingsStore::new(Arc::new(Mutex::new(self.open())))
        }
    }

    impl Default for TestDatabase {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Async test helpers
pub mod async_helpers {
    use std::time::Duration;
    use tokio::time::timeout;

    /// Default test timeout (5 seconds)
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Run an async operation with a timeout
    pub async fn with_timeout<F, T>(duration: Duration, f: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        timeout(duration, f).await.expect("Operation timed out")
    }

    /// Poll `condition` until it holds or `duration` elapses
    pub async fn wait_for<F>(duration: Duration, condition: F) -> bool
    where
        F: Fn() -> bool,
    {
        let deadline = tokio::time::Instant::now() + duration;
        while tokio::time::Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        condition()
    }
}
