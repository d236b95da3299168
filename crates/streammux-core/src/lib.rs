//! # StreamMux Core Library
//!
//! Event multiplexing over one long-lived backend connection.
//!
//! ## Modules
//!
//! - `domain` - Events, commands and connection lifecycle types
//! - `codec` - JSON wire envelope encoding/decoding
//! - `router` - Event router (pub/sub over the connection) and correlation helpers
//! - `validation` - Field validation rules
//! - `settings` - Persisted, observable settings
//! - `config` - Client configuration

pub mod codec;
pub mod config;
pub mod domain;
pub mod router;
pub mod settings;
pub mod validation;

// Re-export commonly used types
pub use codec::{CodecError, JsonCodec};
pub use config::{BackoffPolicy, ClientConfig, ConfigError};
pub use domain::*;
pub use router::{
    Diagnostic, EventRouter, EventStream, Filter, HandlerResult, RouterEndpoints, RouterError,
    SubscriptionId,
};
pub use settings::{keys, MemorySettingsStore, Setting, Settings, SettingsBatch, SettingsStore};
pub use validation::{ValidationError, ValidationReport, ValidationRule};
