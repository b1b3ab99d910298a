//! Shared state handed to HTTP handlers.

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

use gatepass_core::ValidationPolicy;
use gatepass_credentials::{
    AccessLogger, CredentialIssuer, CredentialStore, CredentialValidator, ScanMetrics, Scanner,
};

use crate::config::StorageBackend;

pub struct NodeState {
    pub store: Arc<dyn CredentialStore>,
    pub issuer: CredentialIssuer,
    pub scanner: Scanner,
    pub policy: ValidationPolicy,
    pub backend: StorageBackend,
    /// Serve `GET /metrics`.
    pub metrics_endpoint: bool,
    pub start_time: Instant,
}

impl NodeState {
    /// Wire the credential services over one record store.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        policy: ValidationPolicy,
        backend: StorageBackend,
    ) -> Result<Self> {
        let metrics = Arc::new(ScanMetrics::new()?);
        let validator = Arc::new(CredentialValidator::new(store.clone(), policy.clone()));
        let logger = Arc::new(AccessLogger::new(
            store.clone(),
            metrics,
            policy.store_timeout(),
        ));
        let scanner = Scanner::new(validator, logger);
        let issuer = CredentialIssuer::new(store.clone(), policy.clone());

        Ok(Self {
            store,
            issuer,
            scanner,
            policy,
            backend,
            metrics_endpoint: true,
            start_time: Instant::now(),
        })
    }

    pub fn with_metrics_endpoint(mut self, enabled: bool) -> Self {
        self.metrics_endpoint = enabled;
        self
    }
}
