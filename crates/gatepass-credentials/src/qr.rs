//! QR payload codec.
//!
//! A payload binds a credential reference to its generation time with a
//! SHA-256 hash over `credential_id:credential_number:event_id:timestamp`.
//! Freshness is not checked here; that is validator policy.

use chrono::{DateTime, Utc};
use qrcode::render::{svg, unicode};
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gatepass_core::{Credential, CredentialNumber};
use gatepass_crypto::{digest_eq, digest_fields, digest_from_hex, hex_digest, Digest};

use crate::error::CredentialError;

/// Current payload format version.
pub const PAYLOAD_VERSION: u32 = 1;

/// Minimum edge length of rendered SVG codes, in pixels.
const SVG_MIN_DIMENSION: u32 = 256;

/// The structured content of a credential QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    pub credential_id: Uuid,
    pub credential_number: CredentialNumber,
    pub event_id: Uuid,
    /// Generation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Lower-case hex SHA-256.
    pub hash: String,
    pub version: u32,
}

impl QrPayload {
    /// Generation time, if the timestamp is representable.
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Compact JSON, the exact string embedded in the QR image.
    pub fn to_json(&self) -> Result<String, CredentialError> {
        serde_json::to_string(self).map_err(|e| CredentialError::MalformedPayload(e.to_string()))
    }
}

/// Digest binding a credential reference to a generation timestamp.
pub fn payload_digest(
    credential_id: Uuid,
    credential_number: &CredentialNumber,
    event_id: Uuid,
    timestamp: i64,
) -> Digest {
    digest_fields(&[
        &credential_id.to_string(),
        credential_number.as_str(),
        &event_id.to_string(),
        &timestamp.to_string(),
    ])
}

/// Build a fresh payload for `credential`, stamped at `now`.
pub fn encode(credential: &Credential, now: DateTime<Utc>) -> QrPayload {
    let timestamp = now.timestamp_millis();
    let digest = payload_digest(
        credential.id,
        &credential.credential_number,
        credential.event_id,
        timestamp,
    );

    tracing::debug!(
        credential_id = %credential.id,
        credential_number = %credential.credential_number,
        timestamp,
        "QR payload generated"
    );

    QrPayload {
        credential_id: credential.id,
        credential_number: credential.credential_number.clone(),
        event_id: credential.event_id,
        timestamp,
        hash: hex_digest(&digest),
        version: PAYLOAD_VERSION,
    }
}

/// Parse a scanned string into a payload.
pub fn decode(raw: &str) -> Result<QrPayload, CredentialError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CredentialError::MalformedPayload("empty input".into()));
    }

    let payload: QrPayload = serde_json::from_str(raw)
        .map_err(|e| CredentialError::MalformedPayload(e.to_string()))?;

    if payload.version != PAYLOAD_VERSION {
        return Err(CredentialError::MalformedPayload(format!(
            "unsupported payload version {}",
            payload.version
        )));
    }

    Ok(payload)
}

/// Recompute the payload hash from the stored credential's canonical fields
/// and compare it with the hash carried by the payload.
pub fn verify_hash(payload: &QrPayload, credential: &Credential) -> bool {
    let expected = payload_digest(
        credential.id,
        &credential.credential_number,
        credential.event_id,
        payload.timestamp,
    );
    match digest_from_hex(&payload.hash) {
        Ok(actual) => digest_eq(&expected, &actual),
        Err(_) => false,
    }
}

fn qr_code(payload: &QrPayload) -> Result<QrCode, CredentialError> {
    let json = payload.to_json()?;
    QrCode::new(json.as_bytes()).map_err(|e| CredentialError::QrRender(e.to_string()))
}

/// Render the payload as an SVG document.
pub fn render_svg(payload: &QrPayload) -> Result<String, CredentialError> {
    let code = qr_code(payload)?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(SVG_MIN_DIMENSION, SVG_MIN_DIMENSION)
        .build())
}

/// Render the payload with Unicode half blocks for terminal display.
pub fn render_terminal(payload: &QrPayload) -> Result<String, CredentialError> {
    let code = qr_code(payload)?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}
