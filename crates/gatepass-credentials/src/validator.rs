use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use gatepass_core::{Credential, CredentialStatus, DenialReason, ValidationPolicy};

use crate::error::ValidationInfrastructureError;
use crate::qr::{self, QrPayload};
use crate::store::{bounded, CredentialStore};

/// A rejected validation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub reason: DenialReason,
    /// Operator-facing message.
    pub error: String,
    /// The looked-up credential, when the attempt got that far.
    pub credential: Option<Credential>,
    /// The decoded payload of an attempt that never resolved to a
    /// credential.
    pub unresolved: Option<QrPayload>,
}

/// Result of one validation attempt: exactly one of valid or invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid { credential: Credential },
    Invalid(Denial),
}

impl ValidationOutcome {
    fn deny(reason: DenialReason, credential: Option<Credential>) -> Self {
        Self::Invalid(Denial {
            reason,
            error: reason.message().to_string(),
            credential,
            unresolved: None,
        })
    }

    fn deny_unresolved(reason: DenialReason, payload: &QrPayload) -> Self {
        Self::Invalid(Denial {
            reason,
            error: reason.message().to_string(),
            credential: None,
            unresolved: Some(payload.clone()),
        })
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn reason(&self) -> Option<DenialReason> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid(denial) => Some(denial.reason),
        }
    }

    /// The credential the attempt resolved to, valid or not.
    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Self::Valid { credential } => Some(credential),
            Self::Invalid(denial) => denial.credential.as_ref(),
        }
    }
}

/// Wire shape of a validation outcome:
/// `{valid: true, credential}` or `{valid: false, error, reason}`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
}

impl From<&ValidationOutcome> for ValidationReport {
    fn from(outcome: &ValidationOutcome) -> Self {
        match outcome {
            ValidationOutcome::Valid { credential } => Self {
                valid: true,
                credential: Some(credential.clone()),
                error: None,
                reason: None,
            },
            ValidationOutcome::Invalid(denial) => Self {
                valid: false,
                credential: None,
                error: Some(denial.error.clone()),
                reason: Some(denial.reason),
            },
        }
    }
}

/// Validates scanned QR payloads against the record store.
///
/// Checks run in order and stop at the first failure:
/// parse, freshness, lookup, status, validity window, hash integrity.
pub struct CredentialValidator {
    store: Arc<dyn CredentialStore>,
    policy: ValidationPolicy,
}

impl CredentialValidator {
    pub fn new(store: Arc<dyn CredentialStore>, policy: ValidationPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validate a raw scanned string at time `now`.
    ///
    /// Denials are `Ok(ValidationOutcome::Invalid)`; only a failing or
    /// timed-out store yields `Err`.
    pub async fn validate(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<ValidationOutcome, ValidationInfrastructureError> {
        match qr::decode(raw) {
            Ok(payload) => self.validate_payload(&payload, now).await,
            Err(e) => {
                tracing::debug!(error = %e, "unparseable scan input");
                Ok(ValidationOutcome::deny(DenialReason::InvalidFormat, None))
            }
        }
    }

    /// Validate an already decoded payload.
    pub async fn validate_payload(
        &self,
        payload: &QrPayload,
        now: DateTime<Utc>,
    ) -> Result<ValidationOutcome, ValidationInfrastructureError> {
        if self.policy.enforce_freshness {
            let age_ms = now.timestamp_millis().saturating_sub(payload.timestamp);
            if age_ms > self.policy.freshness_window().num_milliseconds() {
                tracing::info!(
                    credential_number = %payload.credential_number,
                    age_ms,
                    "stale QR payload"
                );
                return Ok(ValidationOutcome::deny_unresolved(
                    DenialReason::ExpiredQr,
                    payload,
                ));
            }
            if age_ms < -self.policy.max_clock_skew().num_milliseconds() {
                tracing::warn!(
                    credential_number = %payload.credential_number,
                    ahead_ms = -age_ms,
                    "QR payload stamped in the future"
                );
                return Ok(ValidationOutcome::deny_unresolved(
                    DenialReason::ExpiredQr,
                    payload,
                ));
            }
        }

        let found = bounded(
            self.policy.store_timeout(),
            self.store
                .find_credential(payload.credential_id, &payload.credential_number),
        )
        .await?;

        let credential = match found {
            Some(c) => c,
            None => {
                tracing::info!(
                    credential_id = %payload.credential_id,
                    credential_number = %payload.credential_number,
                    "credential not found"
                );
                return Ok(ValidationOutcome::deny_unresolved(
                    DenialReason::NotFound,
                    payload,
                ));
            }
        };

        if let Some(reason) = credential.status.denial_reason() {
            return Ok(self.reject(reason, credential));
        }
        debug_assert_eq!(credential.status, CredentialStatus::Active);

        if now < credential.valid_from {
            return Ok(self.reject(DenialReason::NotYetValid, credential));
        }
        if now > credential.valid_until {
            return Ok(self.reject(DenialReason::Expired, credential));
        }

        if !qr::verify_hash(payload, &credential) {
            tracing::warn!(
                credential_id = %credential.id,
                credential_number = %credential.credential_number,
                "QR payload hash mismatch"
            );
            return Ok(ValidationOutcome::deny(
                DenialReason::InvalidHash,
                Some(credential),
            ));
        }

        tracing::info!(
            credential_id = %credential.id,
            credential_number = %credential.credential_number,
            "credential valid"
        );
        Ok(ValidationOutcome::Valid { credential })
    }

    fn reject(&self, reason: DenialReason, credential: Credential) -> ValidationOutcome {
        tracing::info!(
            credential_id = %credential.id,
            credential_number = %credential.credential_number,
            reason = %reason,
            "credential rejected"
        );
        ValidationOutcome::deny(reason, Some(credential))
    }
}
