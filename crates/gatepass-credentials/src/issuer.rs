use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use gatepass_core::types::CREDENTIAL_SUFFIX_LIMIT;
use gatepass_core::{
    AuthSession, ChampionshipEvent, Credential, CredentialEvent, CredentialNumber,
    CredentialRequest, CredentialStateMachine, CredentialStatus, RequestStatus, ValidationPolicy,
};

use crate::error::{CredentialError, StoreError};
use crate::store::{bounded, CredentialStore};

/// Supplies the six-digit suffix of new credential numbers.
pub trait NumberSource: Send + Sync {
    fn next_suffix(&self) -> u32;
}

/// Uniformly random suffixes.
#[derive(Debug, Default)]
pub struct RandomNumberSource;

impl NumberSource for RandomNumberSource {
    fn next_suffix(&self) -> u32 {
        rand::thread_rng().gen_range(0..CREDENTIAL_SUFFIX_LIMIT)
    }
}

/// Increasing suffixes starting at a given value, wrapping at one million.
#[derive(Debug)]
pub struct SequentialNumberSource {
    next: AtomicU32,
}

impl SequentialNumberSource {
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first % CREDENTIAL_SUFFIX_LIMIT),
        }
    }
}

impl NumberSource for SequentialNumberSource {
    fn next_suffix(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed) % CREDENTIAL_SUFFIX_LIMIT
    }
}

/// Issues credentials from approved requests and applies administrative
/// status changes.
pub struct CredentialIssuer {
    store: Arc<dyn CredentialStore>,
    numbers: Box<dyn NumberSource>,
    policy: ValidationPolicy,
}

impl CredentialIssuer {
    /// Create an issuer that draws random credential numbers.
    pub fn new(store: Arc<dyn CredentialStore>, policy: ValidationPolicy) -> Self {
        Self {
            store,
            numbers: Box::new(RandomNumberSource),
            policy,
        }
    }

    /// Replace the credential number source.
    pub fn with_number_source(mut self, source: impl NumberSource + 'static) -> Self {
        self.numbers = Box::new(source);
        self
    }

    fn authorize(&self, session: &AuthSession) -> Result<(), CredentialError> {
        if session.can_administer() {
            Ok(())
        } else {
            tracing::warn!(actor = %session.actor_id, role = %session.role, "credential management refused");
            Err(CredentialError::Unauthorized(session.actor_id.clone()))
        }
    }

    /// Turn an approved request into a persisted, active credential.
    ///
    /// The number is `B12-<year of now>-<suffix>`; suffixes that collide
    /// with an existing credential are redrawn up to the policy limit.
    pub async fn issue(
        &self,
        session: &AuthSession,
        request: &CredentialRequest,
        event: &ChampionshipEvent,
        now: DateTime<Utc>,
    ) -> Result<Credential, CredentialError> {
        self.authorize(session)?;

        if request.status != RequestStatus::Approved {
            return Err(CredentialError::RequestNotApproved {
                id: request.id.to_string(),
                status: request.status,
            });
        }
        if request.event_id != event.id {
            return Err(CredentialError::EventMismatch(request.id.to_string()));
        }

        let access_levels = request.granted_access_levels();
        if access_levels.is_empty() {
            return Err(CredentialError::NoAccessLevels(request.id.to_string()));
        }

        if event.start_date.is_none() {
            return Err(CredentialError::MissingEventDates(event.id.to_string()));
        }
        let (valid_from, valid_until) = event
            .validity_window()
            .map_err(|e| CredentialError::InvalidEventDates(e.to_string()))?;

        let attempts = self.policy.max_number_attempts.max(1);
        for attempt in 1..=attempts {
            let credential_number =
                CredentialNumber::from_parts(now.year(), self.numbers.next_suffix())?;
            let credential = Credential {
                id: Uuid::now_v7(),
                credential_number,
                holder_name: request.holder_name.clone(),
                holder_title: request.holder_title.clone(),
                organization_name: request.organization_name.clone(),
                event_id: event.id,
                access_levels: access_levels.clone(),
                valid_from,
                valid_until,
                status: CredentialStatus::Active,
                request_id: Some(request.id),
                issued_at: now,
                issued_by: Some(session.actor_id.clone()),
                revoked_at: None,
                revoked_by: None,
                revocation_reason: None,
            };

            match bounded(
                self.policy.store_timeout(),
                self.store.insert_credential(&credential),
            )
            .await
            {
                Ok(()) => {
                    tracing::info!(
                        credential_id = %credential.id,
                        credential_number = %credential.credential_number,
                        request_id = %request.id,
                        event_id = %event.id,
                        issued_by = %session.actor_id,
                        "credential issued"
                    );
                    return Ok(credential);
                }
                Err(StoreError::DuplicateCredentialNumber(number)) => {
                    tracing::debug!(%number, attempt, "credential number taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(attempts, "credential number space exhausted");
        Err(CredentialError::NumberSpaceExhausted(attempts))
    }

    /// Load a request and its event from the store, then issue.
    pub async fn issue_for_request(
        &self,
        session: &AuthSession,
        request_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Credential, CredentialError> {
        let timeout = self.policy.store_timeout();
        let request = bounded(timeout, self.store.get_request(request_id))
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("request {}", request_id)))?;
        let event = bounded(timeout, self.store.get_event(request.event_id))
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("event {}", request.event_id)))?;
        self.issue(session, &request, &event, now).await
    }

    /// Permanently revoke a credential.
    pub async fn revoke(
        &self,
        session: &AuthSession,
        credential_id: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Credential, CredentialError> {
        self.authorize(session)?;
        let mut credential = self.load(credential_id).await?;
        credential.status =
            CredentialStateMachine::transition(credential.status, CredentialEvent::Revoke)?;
        credential.revoked_at = Some(now);
        credential.revoked_by = Some(session.actor_id.clone());
        credential.revocation_reason = reason;
        self.save(&credential).await?;

        tracing::info!(
            credential_id = %credential.id,
            credential_number = %credential.credential_number,
            revoked_by = %session.actor_id,
            "credential revoked"
        );
        Ok(credential)
    }

    /// Mark a credential as expired ahead of its validity window end.
    pub async fn expire(
        &self,
        session: &AuthSession,
        credential_id: Uuid,
    ) -> Result<Credential, CredentialError> {
        self.authorize(session)?;
        let mut credential = self.load(credential_id).await?;
        credential.status =
            CredentialStateMachine::transition(credential.status, CredentialEvent::Expire)?;
        self.save(&credential).await?;

        tracing::info!(
            credential_id = %credential.id,
            credential_number = %credential.credential_number,
            expired_by = %session.actor_id,
            "credential expired"
        );
        Ok(credential)
    }

    async fn load(&self, credential_id: Uuid) -> Result<Credential, CredentialError> {
        let credential = bounded(
            self.policy.store_timeout(),
            self.store.get_credential(credential_id),
        )
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("credential {}", credential_id)))?;
        Ok(credential)
    }

    async fn save(&self, credential: &Credential) -> Result<(), CredentialError> {
        bounded(
            self.policy.store_timeout(),
            self.store.update_credential(credential),
        )
        .await?;
        Ok(())
    }
}
