//! Settings Service
//!
//! Typed access over a [`SettingsStore`], plus observable cells: a
//! [`Setting`] persists on `set` and notifies every watcher of the same key.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{info, warn};

use super::SettingsStore;

/// Service for managing persisted settings with typed access.
///
/// # Example
/// ```ignore
/// let settings = Settings::new(Arc::new(MemorySettingsStore::new()));
///
/// let key = settings.observable(keys::newrelic::LICENSE_KEY, String::new()).await?;
/// key.set("0123456789abcdef0123456789abcdef01234567".to_string()).await?;
/// assert_eq!(key.get().len(), 40);
/// ```
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn SettingsStore>,
    cells: Arc<Mutex<HashMap<String, Arc<watch::Sender<Value>>>>>,
}

impl Settings {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            cells: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // =========================================================================
    // Generic typed access
    // =========================================================================

    /// Get a setting value parsed as the specified type.
    ///
    /// Returns `None` if the key doesn't exist or parsing fails.
    pub async fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(value)) => {
                if let Ok(parsed) = serde_json::from_str(&value) {
                    return Some(parsed);
                }
                // Plain strings are stored unquoted
                if let Ok(parsed) = serde_json::from_value(Value::String(value.clone())) {
                    return Some(parsed);
                }
                warn!("[Settings] Failed to parse '{}' value: {}", key, value);
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("[Settings] Failed to get '{}': {}", key, e);
                None
            }
        }
    }

    /// Get a setting value with a default if not set.
    pub async fn get_or_default<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_typed(key).await.unwrap_or(default)
    }

    /// Set a setting value, serializing it appropriately.
    pub async fn set_typed<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let serialized = raw_value(&serde_json::to_value(value)?);
        self.store
            .set(key, &serialized)
            .await
            .with_context(|| format!("Failed to persist setting '{}'", key))
    }

    /// Persist every value in `batch` in one store write, then notify the
    /// watchers of each key. Nothing is notified if the write fails.
    pub async fn set_all(&self, batch: SettingsBatch) -> anyhow::Result<()> {
        let raw: Vec<(String, String)> = batch
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), raw_value(value)))
            .collect();
        self.store
            .set_all(&raw)
            .await
            .with_context(|| format!("Failed to persist {} settings", raw.len()))?;

        let cells = self.cells.lock();
        for (key, value) in batch.entries {
            if let Some(cell) = cells.get(&key) {
                cell.send_replace(value);
            }
        }
        Ok(())
    }

    /// Remove a setting.
    pub async fn reset(&self, key: &str) -> anyhow::Result<()> {
        info!("[Settings] Resetting '{}'", key);
        self.store
            .delete(key)
            .await
            .with_context(|| format!("Failed to delete setting '{}'", key))
    }

    // =========================================================================
    // Observables
    // =========================================================================

    /// An observable cell for `key`, seeded from the store (or `default`).
    ///
    /// Every observable for the same key shares one cell, so a `set` through
    /// any of them is seen by all watchers.
    pub async fn observable<T>(&self, key: &str, default: T) -> anyhow::Result<Setting<T>>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync,
    {
        if let Some(cell) = self.cells.lock().get(key).cloned() {
            return Ok(Setting::new(self.clone(), key, default, cell));
        }

        let initial: T = self.get_or_default(key, default.clone()).await;
        let initial = serde_json::to_value(&initial)
            .with_context(|| format!("Failed to encode setting '{}'", key))?;

        let cell = self
            .cells
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(watch::channel(initial).0))
            .clone();

        Ok(Setting::new(self.clone(), key, default, cell))
    }
}

/// Plain strings are stored unquoted, everything else as JSON
fn raw_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Values written together by [`Settings::set_all`]
#[derive(Debug, Default)]
pub struct SettingsBatch {
    entries: Vec<(String, Value)>,
}

impl SettingsBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize>(mut self, key: &str, value: &T) -> anyhow::Result<Self> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("Failed to encode setting '{}'", key))?;
        self.entries.push((key.to_string(), value));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A typed, persisted, observable setting
pub struct Setting<T> {
    settings: Settings,
    key: String,
    default: T,
    cell: Arc<watch::Sender<Value>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Setting<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn new(settings: Settings, key: &str, default: T, cell: Arc<watch::Sender<Value>>) -> Self {
        Self {
            settings,
            key: key.to_string(),
            default,
            cell,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value (the default if the stored value does not parse as `T`)
    pub fn get(&self) -> T {
        serde_json::from_value(self.cell.borrow().clone()).unwrap_or_else(|_| self.default.clone())
    }

    /// Persist `value`, then notify watchers
    pub async fn set(&self, value: T) -> anyhow::Result<()> {
        self.settings.set_typed(&self.key, &value).await?;
        self.cell.send_replace(serde_json::to_value(&value)?);
        Ok(())
    }

    /// Delete the persisted value and fall back to the default
    pub async fn reset(&self) -> anyhow::Result<()> {
        self.settings.reset(&self.key).await?;
        self.cell.send_replace(serde_json::to_value(&self.default)?);
        Ok(())
    }

    /// Receiver notified on every change of this key
    pub fn watch(&self) -> watch::Receiver<Value> {
        self.cell.subscribe()
    }
}

impl<T: Clone> Clone for Setting<T> {
    fn clone(&self) -> Self {
        Self {
            settings: self.settings.clone(),
            key: self.key.clone(),
            default: self.default.clone(),
            cell: self.cell.clone(),
            _marker: PhantomData,
        }
    }
}
