//! Prometheus counters for the scan path.
//!
//! Each node owns one registry. `/status` reads a [`MetricsSnapshot`];
//! `/metrics` serves the registry in the text exposition format.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::{Deserialize, Serialize};

const RESULT_GRANTED: &str = "granted";
const RESULT_DENIED: &str = "denied";
const RESULT_ERROR: &str = "error";

const WRITE_OK: &str = "ok";
const WRITE_FAILED: &str = "failed";

/// Scan and audit-log counters backed by a Prometheus registry.
#[derive(Clone)]
pub struct ScanMetrics {
    registry: Registry,
    /// Scan attempts by `result` (granted, denied, error).
    scans_total: IntCounterVec,
    /// Access log appends by `outcome` (ok, failed).
    access_log_writes_total: IntCounterVec,
    denials_total: IntCounterVec,
    inactive_access_point_total: IntCounter,
}

/// Point-in-time copy of [`ScanMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub scans: u64,
    pub granted: u64,
    pub denied: u64,
    pub infrastructure_errors: u64,
    pub log_writes: u64,
    pub log_failures: u64,
}

impl std::fmt::Debug for ScanMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanMetrics")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl ScanMetrics {
    /// Create the counters in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let scans_total = IntCounterVec::new(
            Opts::new("gatepass_scans_total", "Scan attempts by result"),
            &["result"],
        )?;
        let denials_total = IntCounterVec::new(
            Opts::new("gatepass_scan_denials_total", "Denied scans by reason code"),
            &["reason"],
        )?;
        let access_log_writes_total = IntCounterVec::new(
            Opts::new(
                "gatepass_access_log_writes_total",
                "Access log appends by outcome",
            ),
            &["outcome"],
        )?;
        let inactive_access_point_total = IntCounter::new(
            "gatepass_inactive_access_point_scans_total",
            "Scans refused because the access point is inactive",
        )?;

        registry.register(Box::new(scans_total.clone()))?;
        registry.register(Box::new(denials_total.clone()))?;
        registry.register(Box::new(access_log_writes_total.clone()))?;
        registry.register(Box::new(inactive_access_point_total.clone()))?;

        Ok(Self {
            registry,
            scans_total,
            access_log_writes_total,
            denials_total,
            inactive_access_point_total,
        })
    }

    pub fn record_granted(&self) {
        self.scans_total.with_label_values(&[RESULT_GRANTED]).inc();
    }

    pub fn record_denied(&self, reason_code: &str) {
        self.scans_total.with_label_values(&[RESULT_DENIED]).inc();
        self.denials_total.with_label_values(&[reason_code]).inc();
    }

    pub fn record_infrastructure_error(&self) {
        self.scans_total.with_label_values(&[RESULT_ERROR]).inc();
    }

    pub fn record_inactive_access_point(&self) {
        self.inactive_access_point_total.inc();
    }

    pub(crate) fn record_log_write(&self) {
        self.access_log_writes_total
            .with_label_values(&[WRITE_OK])
            .inc();
    }

    pub(crate) fn record_log_failure(&self) {
        self.access_log_writes_total
            .with_label_values(&[WRITE_FAILED])
            .inc();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let scans = |result: &str| self.scans_total.with_label_values(&[result]).get();
        let writes = |outcome: &str| {
            self.access_log_writes_total
                .with_label_values(&[outcome])
                .get()
        };
        let granted = scans(RESULT_GRANTED);
        let denied = scans(RESULT_DENIED);
        let infrastructure_errors = scans(RESULT_ERROR);
        MetricsSnapshot {
            scans: granted + denied + infrastructure_errors,
            granted,
            denied,
            infrastructure_errors,
            log_writes: writes(WRITE_OK),
            log_failures: writes(WRITE_FAILED),
        }
    }

    /// Gather every counter in the Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("metrics are not UTF-8: {}", e)))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
