//! SQLite implementation of [`SettingsStore`].

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::params;
use streammux_core::SettingsStore;
use tokio::sync::Mutex;

use crate::Database;

/// SQLite-backed settings store.
///
/// Values are stored as text under dotted keys such as
/// `appDynamics.hostName` or `newrelic.licenseKey`.
pub struct SqliteSettingsStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteSettingsStore {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let result = db.connection().query_row(
            "SELECT value FROM settings WHERE key = ?",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute(
            "INSERT INTO settings (key, value, updated_at)
             VALUES (?, ?, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    async fn set_all(&self, entries: &[(String, String)]) -> Result<()> {
        let db = self.db.lock().await;
        db.transaction(|conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO settings (key, value, updated_at)
                 VALUES (?, ?, datetime('now'))
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )?;
            for (key, value) in entries {
                stmt.execute(params![key, value])?;
            }
            Ok(())
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM settings WHERE key = ?", params![key])?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(String, String)>> {
        let db = self.db.lock().await;
        let conn = db.connection();
        let mut stmt = conn.prepare("SELECT key, value FROM settings ORDER BY key")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
