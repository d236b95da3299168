//! StreamMux Storage Layer
//!
//! SQLite persistence for the settings the monitoring controllers observe.
//!
//! # Usage
//!
//! ```rust,ignore
//! use streammux_core::Settings;
//! use streammux_storage::{Database, SqliteSettingsStore};
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! let db = Database::open(&path)?;
//! let store = SqliteSettingsStore::new(Arc::new(Mutex::new(db)));
//! let settings = Settings::new(Arc::new(store));
//! ```

mod database;
mod settings_store;

use std::path::{Path, PathBuf};

pub use database::Database;
pub use settings_store::SqliteSettingsStore;

/// Default database file name.
pub const DATABASE_FILE: &str = "streammux.db";

/// Application data directory for the current platform.
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("streammux"))
}

/// Database path inside `data_dir`.
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

/// Get the default database path for the current platform.
pub fn default_database_path() -> Option<PathBuf> {
    default_data_dir().map(|dir| database_path(&dir))
}
