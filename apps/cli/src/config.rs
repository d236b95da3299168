//! Environment configuration
//!
//! Every knob has a default; `STREAMMUX_*` variables (optionally from a
//! `.env` file) override them.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use streammux_core::ClientConfig;

pub const URL: &str = "STREAMMUX_URL";
pub const BACKOFF_INITIAL_MS: &str = "STREAMMUX_BACKOFF_INITIAL_MS";
pub const BACKOFF_MAX_MS: &str = "STREAMMUX_BACKOFF_MAX_MS";
pub const BACKOFF_MULTIPLIER: &str = "STREAMMUX_BACKOFF_MULTIPLIER";
pub const QUEUE_CAPACITY: &str = "STREAMMUX_QUEUE_CAPACITY";
pub const PROVISION_TIMEOUT_SECS: &str = "STREAMMUX_PROVISION_TIMEOUT_SECS";
pub const DATA_DIR: &str = "STREAMMUX_DATA_DIR";

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub client: ClientConfig,
    pub data_dir: PathBuf,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut client = ClientConfig::default();

        if let Some(url) = lookup(URL) {
            client.url = url;
        }
        if let Some(ms) = parse(&lookup, BACKOFF_INITIAL_MS)? {
            client.backoff.initial_delay_ms = ms;
        }
        if let Some(ms) = parse(&lookup, BACKOFF_MAX_MS)? {
            client.backoff.max_delay_ms = ms;
        }
        if let Some(multiplier) = parse(&lookup, BACKOFF_MULTIPLIER)? {
            client.backoff.multiplier = multiplier;
        }
        if let Some(capacity) = parse(&lookup, QUEUE_CAPACITY)? {
            client.outbound_queue_capacity = capacity;
        }
        if let Some(secs) = parse(&lookup, PROVISION_TIMEOUT_SECS)? {
            client.provision_timeout_secs = Some(secs);
        }
        client.validate().context("Invalid stream configuration")?;

        let data_dir = match lookup(DATA_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => streammux_storage::default_data_dir()
                .unwrap_or_else(|| PathBuf::from(".streammux")),
        };

        Ok(Self { client, data_dir })
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn database_path(&self) -> PathBuf {
        streammux_storage::database_path(&self.data_dir)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("{}={:?} is invalid: {}", key, raw, e)),
        None => Ok(None),
    }
}
