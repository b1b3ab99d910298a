use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::RwLock;
use std::time::Duration;
use uuid::Uuid;

use gatepass_core::{
    AccessLogEntry, AccessPoint, ChampionshipEvent, Credential, CredentialNumber,
    CredentialRequest,
};

use crate::error::StoreError;

/// Record store backing the credential flow.
///
/// Validation only reads credentials and access points and only appends to
/// the access log; credentials are mutated solely by administrative
/// status changes.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a newly issued credential. Fails with
    /// [`StoreError::DuplicateCredentialNumber`] if the number is taken.
    async fn insert_credential(&self, credential: &Credential) -> Result<(), StoreError>;

    async fn get_credential(&self, id: Uuid) -> Result<Option<Credential>, StoreError>;

    /// Look up a credential by its id and number; both must match.
    async fn find_credential(
        &self,
        id: Uuid,
        number: &CredentialNumber,
    ) -> Result<Option<Credential>, StoreError> {
        Ok(self
            .get_credential(id)
            .await?
            .filter(|c| &c.credential_number == number))
    }

    /// Replace an existing credential row.
    async fn update_credential(&self, credential: &Credential) -> Result<(), StoreError>;

    async fn put_access_point(&self, access_point: &AccessPoint) -> Result<(), StoreError>;

    async fn get_access_point(&self, id: Uuid) -> Result<Option<AccessPoint>, StoreError>;

    async fn active_access_points(&self) -> Result<Vec<AccessPoint>, StoreError>;

    /// Append one entry to the access log. Entries are never updated.
    async fn append_access_log(&self, entry: &AccessLogEntry) -> Result<(), StoreError>;

    /// Log entries for a credential, oldest first.
    async fn access_log_for(&self, credential_id: Uuid) -> Result<Vec<AccessLogEntry>, StoreError>;

    async fn put_request(&self, request: &CredentialRequest) -> Result<(), StoreError>;

    async fn get_request(&self, id: Uuid) -> Result<Option<CredentialRequest>, StoreError>;

    async fn put_event(&self, event: &ChampionshipEvent) -> Result<(), StoreError>;

    async fn get_event(&self, id: Uuid) -> Result<Option<ChampionshipEvent>, StoreError>;
}

/// Run a store call with an upper bound on its duration.
pub async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}

/// In-memory record store.
#[derive(Default)]
pub struct MemoryStore {
    credentials: DashMap<Uuid, Credential>,
    /// Credential number → credential id, for uniqueness.
    numbers: DashMap<CredentialNumber, Uuid>,
    access_points: DashMap<Uuid, AccessPoint>,
    access_log: RwLock<Vec<AccessLogEntry>>,
    requests: DashMap<Uuid, CredentialRequest>,
    events: DashMap<Uuid, ChampionshipEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of issued credentials.
    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }

    /// Number of access log entries.
    pub fn access_log_len(&self) -> usize {
        self.access_log.read().map(|log| log.len()).unwrap_or(0)
    }

    /// Snapshot of the whole access log, oldest first.
    pub fn access_log(&self) -> Vec<AccessLogEntry> {
        self.access_log
            .read()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        match self.numbers.entry(credential.credential_number.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateCredentialNumber(
                credential.credential_number.to_string(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(credential.id);
                self.credentials.insert(credential.id, credential.clone());
                Ok(())
            }
        }
    }

    async fn get_credential(&self, id: Uuid) -> Result<Option<Credential>, StoreError> {
        Ok(self.credentials.get(&id).map(|c| c.clone()))
    }

    async fn update_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        match self.credentials.get_mut(&credential.id) {
            Some(mut existing) => {
                *existing = credential.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("credential {}", credential.id))),
        }
    }

    async fn put_access_point(&self, access_point: &AccessPoint) -> Result<(), StoreError> {
        self.access_points
            .insert(access_point.id, access_point.clone());
        Ok(())
    }

    async fn get_access_point(&self, id: Uuid) -> Result<Option<AccessPoint>, StoreError> {
        Ok(self.access_points.get(&id).map(|ap| ap.clone()))
    }

    async fn active_access_points(&self) -> Result<Vec<AccessPoint>, StoreError> {
        let mut points: Vec<AccessPoint> = self
            .access_points
            .iter()
            .filter(|ap| ap.is_active)
            .map(|ap| ap.value().clone())
            .collect();
        points.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(points)
    }

    async fn append_access_log(&self, entry: &AccessLogEntry) -> Result<(), StoreError> {
        self.access_log
            .write()
            .map_err(|_| StoreError::Unavailable("access log lock poisoned".into()))?
            .push(entry.clone());
        Ok(())
    }

    async fn access_log_for(&self, credential_id: Uuid) -> Result<Vec<AccessLogEntry>, StoreError> {
        let log = self
            .access_log
            .read()
            .map_err(|_| StoreError::Unavailable("access log lock poisoned".into()))?;
        Ok(log
            .iter()
            .filter(|e| e.credential_id == Some(credential_id))
            .cloned()
            .collect())
    }

    async fn put_request(&self, request: &CredentialRequest) -> Result<(), StoreError> {
        self.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<CredentialRequest>, StoreError> {
        Ok(self.requests.get(&id).map(|r| r.clone()))
    }

    async fn put_event(&self, event: &ChampionshipEvent) -> Result<(), StoreError> {
        self.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<ChampionshipEvent>, StoreError> {
        Ok(self.events.get(&id).map(|e| e.clone()))
    }
}
