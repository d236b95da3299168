//! # StreamMux Monitoring
//!
//! Provisioning state machines for the monitoring integrations, built on the
//! event router.
//!
//! - [`ProvisioningMachine`]: the generic workflow, one per integration
//! - [`NewRelicController`] / [`AppDynamicsController`]: persisted
//!   configuration, validation and the integration-specific commands

pub mod appdynamics;
mod error;
pub mod integration;
pub mod machine;
pub mod newrelic;
pub mod rules;
pub mod session;

pub use appdynamics::{AppDynamicsConfig, AppDynamicsController};
pub use error::ProvisioningError;
pub use integration::{AppDynamics, Integration, NewRelic, MONITORING, PROVISIONING_STATUS};
pub use machine::ProvisioningMachine;
pub use newrelic::{JavaSupport, NewRelicController};
pub use session::{describe_status, Progress, ProvisioningState, ProvisioningView};
