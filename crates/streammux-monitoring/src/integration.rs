//! Integration descriptors
//!
//! An [`Integration`] tells the generic provisioning machine how one
//! monitoring product speaks on the wire: its request family, the event
//! slice it owns and which queries re-establish its state.

use streammux_core::{Command, Filter};

/// Envelope `type` shared by all monitoring events
pub const MONITORING: &str = "monitoring";

/// Sub-stream carrying provisioning progress for every integration
pub const PROVISIONING_STATUS: &str = "ProvisioningStatus";

pub trait Integration: Send + Sync + 'static {
    /// Display name, used in error messages ("Error provisioning <name>: ...")
    fn name(&self) -> &'static str;

    /// Outbound `request` discriminator
    fn request_family(&self) -> &'static str;

    /// Query answered by `availableResponse`
    fn availability_query(&self) -> &'static str;

    /// Reply type carrying the project-enabled flag
    fn project_enabled_reply(&self) -> &'static str;

    /// Events owned by this integration
    fn events(&self) -> Filter;

    /// Queries issued on start and again after every reconnect
    fn initial_queries(&self) -> Vec<&'static str> {
        vec![self.availability_query()]
    }

    /// Events reporting provisioning progress
    fn status_events(&self) -> Filter {
        Filter::match_on_attribute("subtype", PROVISIONING_STATUS)
            .or(Filter::match_on_response(PROVISIONING_STATUS))
    }

    fn command(&self, command_type: &str) -> Command {
        Command::new(self.request_family(), command_type)
    }
}

/// New Relic agent integration
#[derive(Debug, Clone, Copy, Default)]
pub struct NewRelic;

impl Integration for NewRelic {
    fn name(&self) -> &'static str {
        "New Relic"
    }

    fn request_family(&self) -> &'static str {
        "NewRelicRequest"
    }

    fn availability_query(&self) -> &'static str {
        "available"
    }

    fn project_enabled_reply(&self) -> &'static str {
        "isProjectEnabledResponse"
    }

    fn events(&self) -> Filter {
        Filter::match_on_attribute("subtype", "newrelic")
            .or(Filter::match_on_response("NewRelicResponse"))
    }

    fn initial_queries(&self) -> Vec<&'static str> {
        vec!["available", "isSupportedJavaVersion", "isProjectEnabled"]
    }
}

/// AppDynamics agent integration
#[derive(Debug, Clone, Copy, Default)]
pub struct AppDynamics;

impl Integration for AppDynamics {
    fn name(&self) -> &'static str {
        "AppDynamics"
    }

    fn request_family(&self) -> &'static str {
        "AppDynamicsRequest"
    }

    fn availability_query(&self) -> &'static str {
        "isAvailable"
    }

    fn project_enabled_reply(&self) -> &'static str {
        "projectEnabledResponse"
    }

    /// Replies carry `subtype: "appdynamics"` whether they arrive in a
    /// `monitoring` envelope or an `AppDynamicsResponse` one
    fn events(&self) -> Filter {
        Filter::match_on_attribute("subtype", "appdynamics")
    }

    fn initial_queries(&self) -> Vec<&'static str> {
        vec!["isAvailable", "isProjectEnabled"]
    }
}
