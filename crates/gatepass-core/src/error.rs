use crate::credential_state::CredentialStatus;

/// Core domain errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid status transition from {from} to {to}")]
    InvalidStateTransition {
        from: CredentialStatus,
        to: CredentialStatus,
    },

    #[error("invalid credential number: {0}")]
    InvalidCredentialNumber(String),

    #[error("unknown access level: {0}")]
    UnknownAccessLevel(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("invalid operating hours: {0}")]
    InvalidOperatingHours(String),

    #[error("invalid validity window: {0}")]
    InvalidValidityWindow(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}
