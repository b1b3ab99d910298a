use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Policy knobs for credential validation and issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Maximum age of a scanned QR payload, in seconds.
    #[serde(default = "default_freshness_window_secs")]
    pub freshness_window_secs: u64,
    /// Reject payloads older than the freshness window. Deployments that
    /// print QR codes once per event turn this off.
    #[serde(default = "default_true")]
    pub enforce_freshness: bool,
    /// How far a payload timestamp may run ahead of the scanner clock, in
    /// seconds. Only checked when freshness is enforced.
    #[serde(default = "default_max_clock_skew_secs")]
    pub max_clock_skew_secs: u64,
    /// Upper bound on a single record-store call, in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// How many credential numbers issuance tries before giving up.
    #[serde(default = "default_max_number_attempts")]
    pub max_number_attempts: u32,
}

fn default_freshness_window_secs() -> u64 {
    300
}
fn default_true() -> bool {
    true
}
fn default_max_clock_skew_secs() -> u64 {
    30
}
fn default_store_timeout_ms() -> u64 {
    5_000
}
fn default_max_number_attempts() -> u32 {
    5
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            freshness_window_secs: default_freshness_window_secs(),
            enforce_freshness: true,
            max_clock_skew_secs: default_max_clock_skew_secs(),
            store_timeout_ms: default_store_timeout_ms(),
            max_number_attempts: default_max_number_attempts(),
        }
    }
}

impl ValidationPolicy {
    pub fn freshness_window(&self) -> chrono::Duration {
        saturating_seconds(self.freshness_window_secs)
    }

    pub fn max_clock_skew(&self) -> chrono::Duration {
        saturating_seconds(self.max_clock_skew_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Seconds as a chrono duration, clamped to the largest representable span.
fn saturating_seconds(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}
