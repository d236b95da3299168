//! Provisioning session state and its observable view

use std::fmt;

use serde::Serialize;
use streammux_core::{Event, SubscriptionId, ValidationReport};

/// Where a provisioning workflow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningState {
    #[default]
    Idle,
    CheckingAvailability,
    AwaitingConfig,
    Validating,
    Provisioning,
    ReceivingProgress,
    Complete,
    Error,
}

impl ProvisioningState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CheckingAvailability => "checking_availability",
            Self::AwaitingConfig => "awaiting_config",
            Self::Validating => "validating",
            Self::Provisioning => "provisioning",
            Self::ReceivingProgress => "receiving_progress",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// A provision command is outstanding
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Provisioning | Self::ReceivingProgress)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last reported download progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
    Percent(f64),
    Bytes(u64),
}

impl Progress {
    /// Read a `progress` event. A zero percentage defers to a byte count.
    pub fn from_event(event: &Event) -> Option<Self> {
        let percent = event.f64_attr("percent");
        let bytes = event.u64_attr("bytes");
        match (percent, bytes) {
            (Some(p), _) if p != 0.0 => Some(Self::Percent(p)),
            (_, Some(b)) => Some(Self::Bytes(b)),
            (Some(p), None) => Some(Self::Percent(p)),
            (None, None) => None,
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(p) => write!(f, "{:.0}%", p),
            Self::Bytes(b) => write!(f, "{} bytes", b),
        }
    }
}

/// Human-readable description of a named provisioning status
pub fn describe_status(status: &str) -> &'static str {
    match status {
        "authenticating" => "Authenticating",
        "downloadComplete" => "Download complete",
        "validating" => "Validating",
        "extracting" => "Extracting",
        "complete" => "Complete",
        _ => "Unknown state",
    }
}

/// What the view layer sees of one integration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisioningView {
    pub integration: &'static str,
    pub state: ProvisioningState,
    pub available: bool,
    /// Every configured field passes its rule
    pub config_saved: bool,
    pub invalid_fields: Vec<&'static str>,
    pub project_enabled: bool,
    pub progress: Option<Progress>,
    pub progress_description: Option<String>,
    pub error_message: Option<String>,
}

/// Mutable state behind a provisioning machine
pub(crate) struct Session {
    pub(crate) state: ProvisioningState,
    pub(crate) report: ValidationReport,
    pub(crate) available: bool,
    pub(crate) project_enabled: bool,
    pub(crate) progress: Option<Progress>,
    pub(crate) progress_description: Option<String>,
    pub(crate) error_message: Option<String>,
    /// Status stream subscription, held only while a provision is in flight
    pub(crate) status_subscription: Option<SubscriptionId>,
    /// Bumped on every provision start and reset; stale timers compare against it
    pub(crate) flow: u64,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            state: ProvisioningState::Idle,
            report: ValidationReport::new(),
            available: false,
            project_enabled: false,
            progress: None,
            progress_description: None,
            error_message: None,
            status_subscription: None,
            flow: 0,
        }
    }

    pub(crate) fn clear_progress(&mut self) {
        self.progress = None;
        self.progress_description = None;
        self.error_message = None;
    }

    pub(crate) fn view(&self, integration: &'static str) -> ProvisioningView {
        ProvisioningView {
            integration,
            state: self.state,
            available: self.available,
            config_saved: self.report.is_valid(),
            invalid_fields: self.report.invalid_fields(),
            project_enabled: self.project_enabled,
            progress: self.progress,
            progress_description: self.progress_description.clone(),
            error_message: self.error_message.clone(),
        }
    }
}
