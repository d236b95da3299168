use streammux_core::ValidationError;
use thiserror::Error;

use crate::session::ProvisioningState;

/// Errors returned by provisioning operations
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("{integration}: cannot {action} while {state}")]
    InvalidTransition {
        integration: &'static str,
        action: &'static str,
        state: ProvisioningState,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to persist configuration: {0:#}")]
    Settings(#[from] anyhow::Error),
}
