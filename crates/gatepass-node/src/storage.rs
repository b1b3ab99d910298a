//! RocksDB record store for the Gatepass node.

use anyhow::Result;
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tokio::sync::Mutex;
use uuid::Uuid;

use gatepass_core::{AccessLogEntry, AccessPoint, ChampionshipEvent, Credential, CredentialRequest};
use gatepass_credentials::{CredentialStore, StoreError};

/// Column family names for different record types.
const CF_CREDENTIALS: &str = "issued_credentials";
const CF_NUMBERS: &str = "credential_numbers";
const CF_ACCESS_POINTS: &str = "venue_access_points";
const CF_ACCESS_LOG: &str = "credential_access_log";
const CF_REQUESTS: &str = "credential_requests";
const CF_EVENTS: &str = "championship_events";

const COLUMN_FAMILIES: [&str; 6] = [
    CF_CREDENTIALS,
    CF_NUMBERS,
    CF_ACCESS_POINTS,
    CF_ACCESS_LOG,
    CF_REQUESTS,
    CF_EVENTS,
];

/// Log key prefix for entries that never resolved to a credential.
const UNRESOLVED_PREFIX: &str = "unresolved";

/// RocksDB-backed [`CredentialStore`]. Values are JSON.
pub struct RocksStore {
    db: DB,
    /// Serializes credential inserts so the number check and write are atomic.
    insert_lock: Mutex<()>,
}

fn unavailable(e: rocksdb::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// `<credential id | unresolved>:<timestamp ms, zero padded>:<entry id>`,
/// so a prefix scan returns one credential's entries oldest first.
fn log_key(entry: &AccessLogEntry) -> String {
    let owner = entry
        .credential_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| UNRESOLVED_PREFIX.to_string());
    format!(
        "{}:{:020}:{}",
        owner,
        entry.timestamp.timestamp_millis().max(0),
        entry.id
    )
}

impl RocksStore {
    /// Open or create a RocksDB database at the given path with column families.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;
        tracing::debug!(path = %path.display(), "record store opened");

        Ok(Self {
            db,
            insert_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Unavailable(format!("column family '{}' not found", name)))
    }

    fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<(), StoreError> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, encode(value)?).map_err(unavailable)
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>, StoreError> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key).map_err(unavailable)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn exists(&self, cf_name: &str, key: &[u8]) -> Result<bool, StoreError> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, key).map_err(unavailable)?.is_some())
    }
}

#[async_trait]
impl CredentialStore for RocksStore {
    async fn insert_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        let _guard = self.insert_lock.lock().await;
        let number = credential.credential_number.as_str().as_bytes();
        if self.exists(CF_NUMBERS, number)? {
            return Err(StoreError::DuplicateCredentialNumber(
                credential.credential_number.to_string(),
            ));
        }

        let id = credential.id.to_string();
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_CREDENTIALS)?, id.as_bytes(), encode(credential)?);
        batch.put_cf(self.cf(CF_NUMBERS)?, number, id.as_bytes());
        self.db.write(batch).map_err(unavailable)
    }

    async fn get_credential(&self, id: Uuid) -> Result<Option<Credential>, StoreError> {
        self.get(CF_CREDENTIALS, id.to_string().as_bytes())
    }

    async fn update_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        let key = credential.id.to_string();
        if !self.exists(CF_CREDENTIALS, key.as_bytes())? {
            return Err(StoreError::NotFound(format!("credential {}", credential.id)));
        }
        self.put(CF_CREDENTIALS, key.as_bytes(), credential)
    }

    async fn put_access_point(&self, access_point: &AccessPoint) -> Result<(), StoreError> {
        self.put(
            CF_ACCESS_POINTS,
            access_point.id.to_string().as_bytes(),
            access_point,
        )
    }

    async fn get_access_point(&self, id: Uuid) -> Result<Option<AccessPoint>, StoreError> {
        self.get(CF_ACCESS_POINTS, id.to_string().as_bytes())
    }

    async fn active_access_points(&self) -> Result<Vec<AccessPoint>, StoreError> {
        let cf = self.cf(CF_ACCESS_POINTS)?;
        let mut points = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item.map_err(unavailable)?;
            let point: AccessPoint = decode(&value)?;
            if point.is_active {
                points.push(point);
            }
        }
        points.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(points)
    }

    async fn append_access_log(&self, entry: &AccessLogEntry) -> Result<(), StoreError> {
        self.put(CF_ACCESS_LOG, log_key(entry).as_bytes(), entry)
    }

    async fn access_log_for(&self, credential_id: Uuid) -> Result<Vec<AccessLogEntry>, StoreError> {
        let cf = self.cf(CF_ACCESS_LOG)?;
        let prefix = format!("{}:", credential_id);
        let mut entries = Vec::new();
        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(prefix.as_bytes(), Direction::Forward),
        );
        for item in iter {
            let (key, value) = item.map_err(unavailable)?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            entries.push(decode(&value)?);
        }
        Ok(entries)
    }

    async fn put_request(&self, request: &CredentialRequest) -> Result<(), StoreError> {
        self.put(CF_REQUESTS, request.id.to_string().as_bytes(), request)
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<CredentialRequest>, StoreError> {
        self.get(CF_REQUESTS, id.to_string().as_bytes())
    }

    async fn put_event(&self, event: &ChampionshipEvent) -> Result<(), StoreError> {
        self.put(CF_EVENTS, event.id.to_string().as_bytes(), event)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<ChampionshipEvent>, StoreError> {
        self.get(CF_EVENTS, id.to_string().as_bytes())
    }
}
