use std::sync::Arc;
use std::time::Duration;

use gatepass_core::AccessLogEntry;

use crate::error::StoreError;
use crate::metrics::ScanMetrics;
use crate::store::{bounded, CredentialStore};

/// Append-only writer for the access audit trail.
///
/// Failures are returned and counted, but a failed write never changes a
/// decision that was already made.
pub struct AccessLogger {
    store: Arc<dyn CredentialStore>,
    metrics: Arc<ScanMetrics>,
    timeout: Duration,
}

impl AccessLogger {
    pub fn new(store: Arc<dyn CredentialStore>, metrics: Arc<ScanMetrics>, timeout: Duration) -> Self {
        Self {
            store,
            metrics,
            timeout,
        }
    }

    pub fn metrics(&self) -> &Arc<ScanMetrics> {
        &self.metrics
    }

    /// Append one entry.
    pub async fn log(&self, entry: &AccessLogEntry) -> Result<(), StoreError> {
        match bounded(self.timeout, self.store.append_access_log(entry)).await {
            Ok(()) => {
                self.metrics.record_log_write();
                tracing::debug!(
                    entry_id = %entry.id,
                    access_point = %entry.access_point_name,
                    result = %entry.result,
                    "access logged"
                );
                Ok(())
            }
            Err(e) => {
                self.metrics.record_log_failure();
                tracing::warn!(
                    error = %e,
                    entry_id = %entry.id,
                    credential_id = ?entry.credential_id,
                    access_point = %entry.access_point_name,
                    result = %entry.result,
                    "failed to write access log entry"
                );
                Err(e)
            }
        }
    }
}
