use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::DenialReason;

/// The status of an issued credential.
///
/// Status is authoritative over the validity window: a credential whose
/// window covers "now" is still rejected unless it is `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    /// Credential may be used at access points.
    Active,
    /// Credential was withdrawn by an administrator. Final state.
    Revoked,
    /// Credential was expired by an administrator. Final state.
    Expired,
    /// Credential was denied. Final state.
    Denied,
}

impl CredentialStatus {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
            Self::Denied => "denied",
        }
    }

    /// Reason code reported when a scanned credential carries this status.
    /// `None` for `Active`.
    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            Self::Active => None,
            Self::Revoked => Some(DenialReason::Revoked),
            Self::Expired => Some(DenialReason::Expired),
            Self::Denied => Some(DenialReason::Denied),
        }
    }
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "revoked" => Ok(Self::Revoked),
            "expired" => Ok(Self::Expired),
            "denied" => Ok(Self::Denied),
            other => Err(CoreError::ValidationError(format!(
                "invalid credential status: {}",
                other
            ))),
        }
    }
}

/// Administrative actions that change a credential's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialEvent {
    /// An administrator permanently withdraws the credential.
    Revoke,
    /// An administrator marks the credential as expired.
    Expire,
}

/// Applies status transitions for issued credentials.
///
/// Valid transitions:
/// - Active → Revoked (Revoke)
/// - Active → Expired (Expire)
pub struct CredentialStateMachine;

impl CredentialStateMachine {
    /// Attempt a status transition based on an event.
    pub fn transition(
        current: CredentialStatus,
        event: CredentialEvent,
    ) -> Result<CredentialStatus, CoreError> {
        let new_status = match (current, event) {
            (CredentialStatus::Active, CredentialEvent::Revoke) => CredentialStatus::Revoked,
            (CredentialStatus::Active, CredentialEvent::Expire) => CredentialStatus::Expired,
            _ => {
                let target = match event {
                    CredentialEvent::Revoke => CredentialStatus::Revoked,
                    CredentialEvent::Expire => CredentialStatus::Expired,
                };
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: target,
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_status,
            event = ?event,
            "credential status transition"
        );

        Ok(new_status)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: CredentialStatus, event: CredentialEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
