//! Gatepass Core: fundamental types, errors, and policy for championship
//! credentialing. Credentials, access points, access log entries, and the
//! credential status state machine.

pub mod config;
pub mod credential_state;
pub mod error;
pub mod types;

pub use config::ValidationPolicy;
pub use credential_state::{CredentialEvent, CredentialStateMachine, CredentialStatus};
pub use error::CoreError;
pub use types::{
    AccessLevel, AccessLogEntry, AccessPoint, AccessResult, AuthSession, ChampionshipEvent,
    Coordinates, Credential, CredentialNumber, CredentialRequest, DenialReason, OperatingHours,
    RequestStatus, Role,
};
