//! Integration test: request → credential → QR payload → scan → access log.
//!
//! Exercises gatepass-core, gatepass-crypto and gatepass-credentials together
//! over an in-memory record store.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use gatepass_core::{
    AccessLevel, AccessPoint, AccessResult, CredentialStatus, DenialReason, OperatingHours,
    ValidationPolicy,
};
use gatepass_credentials::{qr, CredentialStore, MemoryStore, ScanRequest, ValidationReport};
use gatepass_integration_tests::{admin, approved_request, at, championship, gate_operator, Services};

fn april_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
}

// =========================================================================
// Single-day event
// =========================================================================

#[tokio::test]
async fn test_example_valid_within_event_day() {
    let store = Arc::new(MemoryStore::new());
    let services = Services::new(store.clone(), ValidationPolicy::default()).numbered_from(42);

    let event = championship(april_first(), None);
    let request = approved_request(&event, "Dana Whitfield", &[AccessLevel::PressBox]);
    let credential = services
        .issuer
        .issue(&admin(), &request, &event, at("2025-03-20T09:00:00Z"))
        .await
        .expect("issuance should succeed");

    assert_eq!(credential.credential_number.as_str(), "B12-2025-000042");
    assert_eq!(credential.valid_from, at("2025-04-01T00:00:00Z"));
    assert_eq!(credential.valid_until, at("2025-04-01T23:59:59Z"));
    assert_eq!(credential.status, CredentialStatus::Active);

    let now = at("2025-04-01T12:00:00Z");
    let payload = qr::encode(&credential, now - Duration::minutes(2));
    let outcome = services
        .validator
        .validate(&payload.to_json().unwrap(), now)
        .await
        .unwrap();

    let report = serde_json::to_value(ValidationReport::from(&outcome)).unwrap();
    assert_eq!(report["valid"], true);
    assert_eq!(report["credential"]["credential_number"], "B12-2025-000042");
    assert!(report.get("reason").is_none());
}

#[tokio::test]
async fn test_example_expired_one_second_after_window() {
    let store = Arc::new(MemoryStore::new());
    let services = Services::new(store.clone(), ValidationPolicy::default()).numbered_from(42);

    let event = championship(april_first(), None);
    let request = approved_request(&event, "Dana Whitfield", &[AccessLevel::PressBox]);
    let credential = services
        .issuer
        .issue(&admin(), &request, &event, at("2025-03-20T09:00:00Z"))
        .await
        .unwrap();

    let now = at("2025-04-02T00:00:01Z");
    let payload = qr::encode(&credential, now - Duration::minutes(2));
    let outcome = services
        .validator
        .validate(&payload.to_json().unwrap(), now)
        .await
        .unwrap();

    let report = serde_json::to_value(ValidationReport::from(&outcome)).unwrap();
    assert_eq!(report["valid"], false);
    assert_eq!(report["reason"], "EXPIRED");
    assert_eq!(report["error"], DenialReason::Expired.message());
}

// =========================================================================
// Full scan flow
// =========================================================================

#[tokio::test]
async fn test_issue_and_scan_through_checkpoints() {
    let store = Arc::new(MemoryStore::new());
    let services = Services::new(store.clone(), ValidationPolicy::default());

    let event = championship(april_first(), NaiveDate::from_ymd_opt(2025, 4, 3));
    let request = approved_request(
        &event,
        "Marcus Hale",
        &[AccessLevel::FieldAccess, AccessLevel::InterviewRoom],
    );
    let credential = services
        .issuer
        .issue(&admin(), &request, &event, at("2025-03-28T15:00:00Z"))
        .await
        .unwrap();

    let field = AccessPoint::new("Field Gate", "Home plate", [AccessLevel::FieldAccess])
        .for_event(event.id);
    let press = AccessPoint::new("Press Box", "Level 5", [AccessLevel::PressBox]);
    let interview = AccessPoint::new("Interview Room", "Concourse B", [AccessLevel::InterviewRoom])
        .with_operating_hours(OperatingHours::new(17, 23, -300).unwrap());
    for ap in [&field, &press, &interview] {
        store.put_access_point(ap).await.unwrap();
    }

    // 14:00 UTC on day two is 09:00 at a UTC-5 venue.
    let now = at("2025-04-02T14:00:00Z");
    let payload = qr::encode(&credential, now - Duration::seconds(30))
        .to_json()
        .unwrap();

    let scan = |ap: &AccessPoint| ScanRequest {
        raw_payload: payload.clone(),
        access_point: ap.clone(),
        session: gate_operator(),
        device_id: Some("ipad-7".into()),
        coordinates: None,
    };

    let granted = services.scanner.scan(scan(&field), now).await.unwrap();
    assert!(granted.granted);
    assert_eq!(granted.matched_level, Some(AccessLevel::FieldAccess));

    let wrong_zone = services.scanner.scan(scan(&press), now).await.unwrap();
    assert_eq!(wrong_zone.reason, Some(DenialReason::InsufficientAccess));

    let closed = services.scanner.scan(scan(&interview), now).await.unwrap();
    assert_eq!(closed.reason, Some(DenialReason::OutsideOperatingHours));

    // 23:30 UTC is 18:30 local: the interview room is open.
    let evening = at("2025-04-02T23:30:00Z");
    let fresh = qr::encode(&credential, evening).to_json().unwrap();
    let open = services
        .scanner
        .scan(
            ScanRequest {
                raw_payload: fresh,
                ..scan(&interview)
            },
            evening,
        )
        .await
        .unwrap();
    assert!(open.granted);

    let log = store.access_log_for(credential.id).await.unwrap();
    let results: Vec<AccessResult> = log.iter().map(|e| e.result).collect();
    assert_eq!(
        results,
        vec![
            AccessResult::Granted,
            AccessResult::Denied,
            AccessResult::Denied,
            AccessResult::Granted
        ]
    );
    assert!(log.iter().all(|e| e.event_id == Some(event.id)));
    assert!(log.iter().all(|e| e.scanned_by.as_deref() == Some("gate-north-2")));
    assert_eq!(log[1].access_level_checked, Some(AccessLevel::PressBox));

    let snap = services.scanner.metrics().snapshot();
    assert_eq!(snap.scans, 4);
    assert_eq!(snap.granted, 2);
    assert_eq!(snap.denied, 2);
}

#[tokio::test]
async fn test_revocation_takes_effect_on_next_scan() {
    let store = Arc::new(MemoryStore::new());
    let services = Services::new(store.clone(), ValidationPolicy::default());

    let event = championship(april_first(), None);
    let request = approved_request(&event, "Priya Nair", &[AccessLevel::SidelineAccess]);
    let credential = services
        .issuer
        .issue(&admin(), &request, &event, at("2025-03-01T00:00:00Z"))
        .await
        .unwrap();

    let sideline = AccessPoint::new("Sideline", "Field", [AccessLevel::SidelineAccess]);
    let now = at("2025-04-01T18:00:00Z");
    let raw = qr::encode(&credential, now).to_json().unwrap();
    let request_at = |raw: &str| ScanRequest {
        raw_payload: raw.to_string(),
        access_point: sideline.clone(),
        session: gate_operator(),
        device_id: None,
        coordinates: None,
    };

    assert!(services.scanner.scan(request_at(&raw), now).await.unwrap().granted);

    services
        .issuer
        .revoke(&admin(), credential.id, Some("transferred to another outlet".into()), now)
        .await
        .unwrap();

    let denied = services
        .scanner
        .scan(request_at(&raw), now + Duration::seconds(10))
        .await
        .unwrap();
    assert!(!denied.granted);
    assert_eq!(denied.reason, Some(DenialReason::Revoked));

    let log = store.access_log_for(credential.id).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].result, AccessResult::Revoked);
}

#[tokio::test]
async fn test_tampered_payload_rejected_after_lookup() {
    let store = Arc::new(MemoryStore::new());
    let services = Services::new(store.clone(), ValidationPolicy::default());

    let event = championship(april_first(), None);
    let credential = services
        .issuer
        .issue(
            &admin(),
            &approved_request(&event, "Lee Tran", &[AccessLevel::LockerRoom]),
            &event,
            at("2025-03-01T00:00:00Z"),
        )
        .await
        .unwrap();

    let now = at("2025-04-01T10:00:00Z");
    let mut payload = qr::encode(&credential, now - Duration::minutes(1));
    // Re-stamping without recomputing the hash.
    payload.timestamp = now.timestamp_millis();

    let outcome = services
        .validator
        .validate(&payload.to_json().unwrap(), now)
        .await
        .unwrap();
    assert_eq!(outcome.reason(), Some(DenialReason::InvalidHash));
    assert_eq!(outcome.credential().map(|c| c.id), Some(credential.id));
}

#[tokio::test]
async fn test_printed_codes_with_freshness_disabled() {
    let policy = ValidationPolicy {
        enforce_freshness: false,
        ..ValidationPolicy::default()
    };
    let store = Arc::new(MemoryStore::new());
    let services = Services::new(store.clone(), policy);

    let event = championship(april_first(), NaiveDate::from_ymd_opt(2025, 4, 4));
    let credential = services
        .issuer
        .issue(
            &admin(),
            &approved_request(&event, "Sam Ortiz", &[AccessLevel::Parking]),
            &event,
            at("2025-03-01T00:00:00Z"),
        )
        .await
        .unwrap();

    // Printed the week before the event, scanned on day three.
    let printed = qr::encode(&credential, at("2025-03-25T08:00:00Z"));
    let outcome = services
        .validator
        .validate(&printed.to_json().unwrap(), at("2025-04-03T07:45:00Z"))
        .await
        .unwrap();
    assert!(outcome.is_valid());

    // The hash is still enforced.
    let mut forged = printed.clone();
    forged.hash = gatepass_crypto::hash_hex(b"forged");
    let outcome = services
        .validator
        .validate(&forged.to_json().unwrap(), at("2025-04-03T07:45:00Z"))
        .await
        .unwrap();
    assert_eq!(outcome.reason(), Some(DenialReason::InvalidHash));
}
