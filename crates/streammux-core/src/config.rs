//! Client configuration
//!
//! Deserializable with defaults for every field, so a partial document (or
//! none at all) yields a working configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default backend stream endpoint
pub const DEFAULT_URL: &str = "ws://127.0.0.1:8888/app/stream";

/// Default number of frames buffered while disconnected
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("stream url must not be empty")]
    EmptyUrl,

    #[error("backoff initial delay must be greater than zero")]
    ZeroInitialDelay,

    #[error("backoff max delay ({max_ms}ms) is below the initial delay ({initial_ms}ms)")]
    MaxBelowInitial { initial_ms: u64, max_ms: u64 },

    #[error("backoff multiplier must be at least 1.0, got {0}")]
    MultiplierTooSmall(f64),

    #[error("outbound queue capacity must be greater than zero")]
    ZeroQueueCapacity,
}

/// Reconnect delay policy. A multiplier of 1.0 gives a fixed delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl BackoffPolicy {
    pub fn fixed(delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self {
            initial_delay_ms: ms,
            max_delay_ms: ms,
            multiplier: 1.0,
        }
    }

    /// Delay before reconnect attempt number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let scaled = self.initial_delay_ms as f64 * self.multiplier.powi(attempt.min(64) as i32);
        let capped = scaled.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_delay_ms == 0 {
            return Err(ConfigError::ZeroInitialDelay);
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ConfigError::MaxBelowInitial {
                initial_ms: self.initial_delay_ms,
                max_ms: self.max_delay_ms,
            });
        }
        if !(self.multiplier >= 1.0) {
            return Err(ConfigError::MultiplierTooSmall(self.multiplier));
        }
        Ok(())
    }
}

/// Configuration for one stream client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend stream endpoint
    pub url: String,
    pub backoff: BackoffPolicy,
    /// Frames kept while disconnected; the oldest is dropped when full
    pub outbound_queue_capacity: usize,
    /// Fail a provision that has not finished within this many seconds
    pub provision_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            backoff: BackoffPolicy::default(),
            outbound_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            provision_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn provision_timeout(&self) -> Option<Duration> {
        self.provision_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if self.outbound_queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        self.backoff.validate()
    }
}
