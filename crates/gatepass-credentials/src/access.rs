use chrono::{DateTime, Utc};
use serde::Serialize;

use gatepass_core::{AccessLevel, AccessPoint, Credential, DenialReason};

/// Result of checking a validated credential against an access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum AccessDecision {
    Granted { matched_level: AccessLevel },
    Denied { reason: DenialReason },
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Decide whether `credential` may pass `access_point` at `now`.
///
/// Operating hours are checked first and deny regardless of level match.
/// Otherwise any shared access level grants entry; the reported level is
/// the first shared one in vocabulary order.
pub fn check_access(
    credential: &Credential,
    access_point: &AccessPoint,
    now: DateTime<Utc>,
) -> AccessDecision {
    if let Some(hours) = access_point.operating_hours {
        if !hours.contains(now) {
            return AccessDecision::Denied {
                reason: DenialReason::OutsideOperatingHours,
            };
        }
    }

    match credential
        .access_levels
        .intersection(&access_point.required_access_levels)
        .next()
    {
        Some(level) => AccessDecision::Granted {
            matched_level: *level,
        },
        None => AccessDecision::Denied {
            reason: DenialReason::InsufficientAccess,
        },
    }
}
