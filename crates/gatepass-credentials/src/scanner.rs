use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use gatepass_core::{
    AccessLevel, AccessLogEntry, AccessPoint, AccessResult, AuthSession, Coordinates, Credential,
    DenialReason,
};

use crate::access::{check_access, AccessDecision};
use crate::error::ScanError;
use crate::logger::AccessLogger;
use crate::metrics::ScanMetrics;
use crate::validator::{CredentialValidator, ValidationOutcome};

/// One physical scan at a checkpoint.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub raw_payload: String,
    pub access_point: AccessPoint,
    pub session: AuthSession,
    pub device_id: Option<String>,
    pub coordinates: Option<Coordinates>,
}

/// What the operator is shown after a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanDecision {
    pub granted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_level: Option<AccessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
    pub log_entry_id: Uuid,
    /// False when the audit write failed; the decision stands either way.
    pub log_recorded: bool,
}

/// Runs validation, the access point check, and the audit write for
/// each scan.
pub struct Scanner {
    validator: Arc<CredentialValidator>,
    logger: Arc<AccessLogger>,
}

impl Scanner {
    pub fn new(validator: Arc<CredentialValidator>, logger: Arc<AccessLogger>) -> Self {
        Self { validator, logger }
    }

    pub fn metrics(&self) -> &Arc<ScanMetrics> {
        self.logger.metrics()
    }

    /// Evaluate one scan at `now` and record exactly one access log entry.
    ///
    /// Scans at an inactive access point are refused before anything is
    /// evaluated or logged.
    pub async fn scan(
        &self,
        request: ScanRequest,
        now: DateTime<Utc>,
    ) -> Result<ScanDecision, ScanError> {
        let access_point = &request.access_point;
        if !access_point.is_active {
            tracing::warn!(access_point = %access_point.name, "scan at inactive access point");
            self.metrics().record_inactive_access_point();
            return Err(ScanError::InactiveAccessPoint(access_point.name.clone()));
        }

        let outcome = match self.validator.validate(&request.raw_payload, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.metrics().record_infrastructure_error();
                tracing::error!(
                    error = %e,
                    access_point = %access_point.name,
                    "scan could not be evaluated"
                );
                let entry = self.entry(&request, None, AccessResult::Error, None, None, now);
                let _ = self.logger.log(&entry).await;
                return Err(e.into());
            }
        };

        let mut unresolved = None;
        let (granted, reason, matched_level, credential) = match outcome {
            ValidationOutcome::Valid { credential } => {
                match check_access(&credential, access_point, now) {
                    AccessDecision::Granted { matched_level } => {
                        (true, None, Some(matched_level), Some(credential))
                    }
                    AccessDecision::Denied { reason } => {
                        (false, Some(reason), None, Some(credential))
                    }
                }
            }
            ValidationOutcome::Invalid(denial) => {
                unresolved = denial.unresolved;
                (false, Some(denial.reason), None, denial.credential)
            }
        };

        let result = match reason {
            None => AccessResult::Granted,
            Some(reason) => AccessResult::for_denial(reason),
        };
        let level_checked = matched_level.or_else(|| {
            access_point
                .required_access_levels
                .iter()
                .next()
                .copied()
        });
        let mut entry = self.entry(
            &request,
            credential.as_ref(),
            result,
            reason,
            level_checked,
            now,
        );
        if let Some(payload) = unresolved {
            entry.attempted_credential_id = Some(payload.credential_id);
            entry.attempted_credential_number = Some(payload.credential_number);
        }
        let log_recorded = self.logger.log(&entry).await.is_ok();
        match reason {
            None => self.metrics().record_granted(),
            Some(reason) => self.metrics().record_denied(reason.code()),
        }

        tracing::info!(
            access_point = %access_point.name,
            credential_id = ?credential.as_ref().map(|c| c.id),
            scanned_by = %request.session.actor_id,
            result = %result,
            log_recorded,
            "scan evaluated"
        );

        let message = match reason {
            None => "Access granted".to_string(),
            Some(reason) => reason.message().to_string(),
        };

        Ok(ScanDecision {
            granted,
            reason,
            message,
            matched_level,
            credential,
            log_entry_id: entry.id,
            log_recorded,
        })
    }

    fn entry(
        &self,
        request: &ScanRequest,
        credential: Option<&Credential>,
        result: AccessResult,
        reason: Option<DenialReason>,
        access_level_checked: Option<AccessLevel>,
        now: DateTime<Utc>,
    ) -> AccessLogEntry {
        AccessLogEntry {
            id: Uuid::now_v7(),
            credential_id: credential.map(|c| c.id),
            attempted_credential_id: None,
            attempted_credential_number: None,
            event_id: credential
                .map(|c| c.event_id)
                .or(request.access_point.event_id),
            access_point_name: request.access_point.name.clone(),
            access_level_checked,
            result,
            reason,
            scanned_by: Some(request.session.actor_id.clone()),
            device_id: request.device_id.clone(),
            coordinates: request.coordinates,
            timestamp: now,
        }
    }
}
