//! Shared fixtures for cross-crate scenarios: a wired set of credential
//! services over one store, and a store that can be made to fail.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use gatepass_core::{
    AccessLevel, AccessLogEntry, AccessPoint, AuthSession, ChampionshipEvent, Credential,
    CredentialRequest, RequestStatus, Role, ValidationPolicy,
};
use gatepass_credentials::{
    AccessLogger, CredentialIssuer, CredentialStore, CredentialValidator, MemoryStore,
    ScanMetrics, Scanner, SequentialNumberSource, StoreError,
};

/// Wraps a [`MemoryStore`] with switches for outages.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    /// Credential reads fail with `Unavailable`.
    pub reads_down: AtomicBool,
    /// Access log appends fail with `Unavailable`.
    pub log_down: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_reads_down(&self, down: bool) {
        self.reads_down.store(down, Ordering::SeqCst);
    }

    pub fn set_log_down(&self, down: bool) {
        self.log_down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialStore for FaultyStore {
    async fn insert_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        self.inner.insert_credential(credential).await
    }

    async fn get_credential(&self, id: Uuid) -> Result<Option<Credential>, StoreError> {
        if self.reads_down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("replica lagging".into()));
        }
        self.inner.get_credential(id).await
    }

    async fn update_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        self.inner.update_credential(credential).await
    }

    async fn put_access_point(&self, access_point: &AccessPoint) -> Result<(), StoreError> {
        self.inner.put_access_point(access_point).await
    }

    async fn get_access_point(&self, id: Uuid) -> Result<Option<AccessPoint>, StoreError> {
        self.inner.get_access_point(id).await
    }

    async fn active_access_points(&self) -> Result<Vec<AccessPoint>, StoreError> {
        self.inner.active_access_points().await
    }

    async fn append_access_log(&self, entry: &AccessLogEntry) -> Result<(), StoreError> {
        if self.log_down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("log table locked".into()));
        }
        self.inner.append_access_log(entry).await
    }

    async fn access_log_for(&self, credential_id: Uuid) -> Result<Vec<AccessLogEntry>, StoreError> {
        self.inner.access_log_for(credential_id).await
    }

    async fn put_request(&self, request: &CredentialRequest) -> Result<(), StoreError> {
        self.inner.put_request(request).await
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<CredentialRequest>, StoreError> {
        self.inner.get_request(id).await
    }

    async fn put_event(&self, event: &ChampionshipEvent) -> Result<(), StoreError> {
        self.inner.put_event(event).await
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<ChampionshipEvent>, StoreError> {
        self.inner.get_event(id).await
    }
}

/// Issuer, validator and scanner sharing one store and one metrics set.
pub struct Services {
    pub store: Arc<dyn CredentialStore>,
    pub issuer: CredentialIssuer,
    pub validator: Arc<CredentialValidator>,
    pub scanner: Scanner,
}

impl Services {
    pub fn new(store: Arc<dyn CredentialStore>, policy: ValidationPolicy) -> Self {
        let metrics = Arc::new(ScanMetrics::new().expect("fresh metrics registry"));
        let validator = Arc::new(CredentialValidator::new(store.clone(), policy.clone()));
        let logger = Arc::new(AccessLogger::new(
            store.clone(),
            metrics,
            policy.store_timeout(),
        ));
        Self {
            issuer: CredentialIssuer::new(store.clone(), policy),
            scanner: Scanner::new(validator.clone(), logger),
            validator,
            store,
        }
    }

    /// Number credentials sequentially from `first`.
    pub fn numbered_from(mut self, first: u32) -> Self {
        self.issuer = self
            .issuer
            .with_number_source(SequentialNumberSource::starting_at(first));
        self
    }
}

pub fn admin() -> AuthSession {
    AuthSession::new("conf-admin", Role::Admin).with_display_name("Conference Credentials")
}

pub fn gate_operator() -> AuthSession {
    AuthSession::new("gate-north-2", Role::Scanner)
}

pub fn championship(start: NaiveDate, end: Option<NaiveDate>) -> ChampionshipEvent {
    ChampionshipEvent {
        id: Uuid::now_v7(),
        name: "Big 12 Softball Championship".into(),
        venue: "USA Softball Hall of Fame Stadium".into(),
        start_date: Some(start),
        end_date: end,
    }
}

pub fn approved_request(
    event: &ChampionshipEvent,
    holder: &str,
    levels: &[AccessLevel],
) -> CredentialRequest {
    CredentialRequest {
        id: Uuid::now_v7(),
        holder_name: holder.into(),
        holder_title: "Reporter".into(),
        organization_name: Some("Campus Daily".into()),
        event_id: event.id,
        requested_access_levels: levels.iter().copied().collect::<BTreeSet<_>>(),
        approved_access_levels: None,
        status: RequestStatus::Approved,
    }
}

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|e| panic!("bad timestamp {}: {}", rfc3339, e))
}
