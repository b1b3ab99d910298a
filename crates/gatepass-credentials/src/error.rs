use std::time::Duration;

use gatepass_core::{CoreError, RequestStatus};

/// Record-store failures. These are infrastructure errors, never denials.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("record store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("credential number already issued: {0}")]
    DuplicateCredentialNumber(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record serialization error: {0}")]
    Serialization(String),
}

/// Credential issuance, lifecycle, and codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("actor {0} is not allowed to manage credentials")]
    Unauthorized(String),

    #[error("request {id} is {status}, not approved")]
    RequestNotApproved { id: String, status: RequestStatus },

    #[error("request {0} does not belong to the given event")]
    EventMismatch(String),

    #[error("request {0} grants no access levels")]
    NoAccessLevels(String),

    #[error("event {0} has no start date")]
    MissingEventDates(String),

    #[error("invalid event dates: {0}")]
    InvalidEventDates(String),

    #[error("no free credential number after {0} attempts")]
    NumberSpaceExhausted(u32),

    #[error("malformed QR payload: {0}")]
    MalformedPayload(String),

    #[error("QR rendering failed: {0}")]
    QrRender(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// A validation attempt could not be evaluated because the record store
/// failed. Distinct from a denial; the operator may retry.
#[derive(Debug, thiserror::Error)]
#[error("validation infrastructure error: {source}")]
pub struct ValidationInfrastructureError {
    #[from]
    pub source: StoreError,
}

/// Scan orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("access point {0} is not active")]
    InactiveAccessPoint(String),

    #[error(transparent)]
    Infrastructure(#[from] ValidationInfrastructureError),
}
