//! Gatepass Credentials: issuance, the QR payload codec, validation,
//! access point checks, and the access audit trail.

pub mod access;
pub mod error;
pub mod issuer;
pub mod logger;
pub mod metrics;
pub mod qr;
pub mod scanner;
pub mod store;
pub mod validator;

pub use access::{check_access, AccessDecision};
pub use error::{CredentialError, ScanError, StoreError, ValidationInfrastructureError};
pub use issuer::{CredentialIssuer, NumberSource, RandomNumberSource, SequentialNumberSource};
pub use logger::AccessLogger;
pub use metrics::{MetricsSnapshot, ScanMetrics};
pub use qr::QrPayload;
pub use scanner::{ScanDecision, ScanRequest, Scanner};
pub use store::{CredentialStore, MemoryStore};
pub use validator::{CredentialValidator, Denial, ValidationOutcome, ValidationReport};
