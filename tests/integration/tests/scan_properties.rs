//! Integration test: properties that hold for every scan, whatever the
//! outcome, including when the record store misbehaves.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use gatepass_core::{
    AccessLevel, AccessPoint, AccessResult, Coordinates, Credential, CredentialNumber,
    DenialReason, ValidationPolicy,
};
use gatepass_credentials::{qr, ScanError, ScanRequest};
use gatepass_integration_tests::{
    admin, approved_request, at, championship, gate_operator, FaultyStore, Services,
};

fn tournament() -> (NaiveDate, Option<NaiveDate>) {
    (
        NaiveDate::from_ymd_opt(2025, 5, 14).unwrap(),
        NaiveDate::from_ymd_opt(2025, 5, 17),
    )
}

async fn issued(services: &Services, levels: &[AccessLevel]) -> Credential {
    let (start, end) = tournament();
    let event = championship(start, end);
    services
        .issuer
        .issue(
            &admin(),
            &approved_request(&event, "Jordan Bell", levels),
            &event,
            at("2025-05-01T12:00:00Z"),
        )
        .await
        .unwrap()
}

fn scan_of(raw: String, access_point: &AccessPoint) -> ScanRequest {
    ScanRequest {
        raw_payload: raw,
        access_point: access_point.clone(),
        session: gate_operator(),
        device_id: Some("handheld-3".into()),
        coordinates: Some(Coordinates {
            latitude: 35.52,
            longitude: -97.47,
        }),
    }
}

// =========================================================================
// One log entry per attempt
// =========================================================================

#[tokio::test]
async fn test_every_attempt_writes_exactly_one_entry() {
    let store = FaultyStore::new();
    let services = Services::new(store.clone(), ValidationPolicy::default());
    let credential = issued(&services, &[AccessLevel::GeneralAdmission]).await;
    let gate = AccessPoint::new("Gate A", "North plaza", [AccessLevel::GeneralAdmission]);
    let backstage = AccessPoint::new("Backstage", "Tunnel", [AccessLevel::Backstage]);

    let now = at("2025-05-15T18:00:00Z");
    let fresh = qr::encode(&credential, now).to_json().unwrap();
    let stale = qr::encode(&credential, now - Duration::minutes(6))
        .to_json()
        .unwrap();
    let early = qr::encode(&credential, at("2025-05-13T18:00:00Z"))
        .to_json()
        .unwrap();

    let attempts = vec![
        (scan_of(fresh.clone(), &gate), now),
        (scan_of(fresh.clone(), &backstage), now),
        (scan_of(stale, &gate), now),
        (scan_of("not a qr code".into(), &gate), now),
        (scan_of(early, &gate), at("2025-05-13T18:00:30Z")),
    ];

    let mut expected_len = 0;
    for (request, when) in attempts {
        let decision = services.scanner.scan(request, when).await.unwrap();
        expected_len += 1;
        assert!(decision.log_recorded);
        assert_eq!(store.inner.access_log_len(), expected_len);
        assert_eq!(store.inner.access_log().last().map(|e| e.id), Some(decision.log_entry_id));
    }

    let reasons: Vec<Option<DenialReason>> =
        store.inner.access_log().iter().map(|e| e.reason).collect();
    assert_eq!(
        reasons,
        vec![
            None,
            Some(DenialReason::InsufficientAccess),
            Some(DenialReason::ExpiredQr),
            Some(DenialReason::InvalidFormat),
            Some(DenialReason::NotYetValid),
        ]
    );
    assert!(store
        .inner
        .access_log()
        .iter()
        .all(|e| e.device_id.as_deref() == Some("handheld-3") && e.coordinates.is_some()));
}

#[tokio::test]
async fn test_unresolved_attempts_record_what_was_presented() {
    let store = FaultyStore::new();
    let services = Services::new(store.clone(), ValidationPolicy::default());
    let credential = issued(&services, &[AccessLevel::Parking]).await;
    let lot = AccessPoint::new("Lot C", "East", [AccessLevel::Parking]);
    let now = at("2025-05-16T08:00:00Z");

    let mut unknown = qr::encode(&credential, now);
    unknown.credential_id = uuid::Uuid::now_v7();
    let decision = services
        .scanner
        .scan(scan_of(unknown.to_json().unwrap(), &lot), now)
        .await
        .unwrap();
    assert_eq!(decision.reason, Some(DenialReason::NotFound));

    let stale = qr::encode(&credential, now - Duration::minutes(10));
    let decision = services
        .scanner
        .scan(scan_of(stale.to_json().unwrap(), &lot), now)
        .await
        .unwrap();
    assert_eq!(decision.reason, Some(DenialReason::ExpiredQr));

    let log = store.inner.access_log();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|e| e.credential_id.is_none()));
    assert_eq!(log[0].result, AccessResult::Denied);
    assert_eq!(log[0].access_level_checked, Some(AccessLevel::Parking));
    assert_eq!(log[0].attempted_credential_id, Some(unknown.credential_id));
    assert_eq!(
        log[0].attempted_credential_number,
        Some(credential.credential_number.clone())
    );

    assert_eq!(log[1].result, AccessResult::Expired);
    assert_eq!(log[1].attempted_credential_id, Some(credential.id));
}

// =========================================================================
// Store failures
// =========================================================================

#[tokio::test]
async fn test_log_outage_does_not_change_decision() {
    let store = FaultyStore::new();
    let services = Services::new(store.clone(), ValidationPolicy::default());
    let credential = issued(&services, &[AccessLevel::PressBox]).await;
    let press = AccessPoint::new("Press Box", "Level 4", [AccessLevel::PressBox]);
    let now = at("2025-05-14T20:00:00Z");
    let raw = qr::encode(&credential, now).to_json().unwrap();

    store.set_log_down(true);
    let decision = services
        .scanner
        .scan(scan_of(raw.clone(), &press), now)
        .await
        .unwrap();
    assert!(decision.granted);
    assert!(!decision.log_recorded);
    assert_eq!(store.inner.access_log_len(), 0);

    store.set_log_down(false);
    let decision = services.scanner.scan(scan_of(raw, &press), now).await.unwrap();
    assert!(decision.granted);
    assert!(decision.log_recorded);
    assert_eq!(store.inner.access_log_len(), 1);

    let snap = services.scanner.metrics().snapshot();
    assert_eq!(snap.granted, 2);
    assert_eq!(snap.log_failures, 1);
    assert_eq!(snap.log_writes, 1);
}

#[tokio::test]
async fn test_read_outage_is_an_error_not_a_denial() {
    let store = FaultyStore::new();
    let services = Services::new(store.clone(), ValidationPolicy::default());
    let credential = issued(&services, &[AccessLevel::FieldAccess]).await;
    let field = AccessPoint::new("Field", "Dugout", [AccessLevel::FieldAccess]);
    let now = at("2025-05-15T16:00:00Z");
    let raw = qr::encode(&credential, now).to_json().unwrap();

    store.set_reads_down(true);
    let err = services
        .scanner
        .scan(scan_of(raw.clone(), &field), now)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Infrastructure(_)));

    let log = store.inner.access_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].result, AccessResult::Error);
    assert_eq!(log[0].reason, None);

    let snap = services.scanner.metrics().snapshot();
    assert_eq!(snap.infrastructure_errors, 1);
    assert_eq!(snap.denied, 0);

    // Once the store recovers the same code scans normally.
    store.set_reads_down(false);
    let decision = services.scanner.scan(scan_of(raw, &field), now).await.unwrap();
    assert!(decision.granted);
}

#[tokio::test]
async fn test_inactive_access_point_refused_without_log() {
    let store = FaultyStore::new();
    let services = Services::new(store.clone(), ValidationPolicy::default());
    let credential = issued(&services, &[AccessLevel::VenuePerimeter]).await;
    let mut closed = AccessPoint::new("Old Gate", "West", [AccessLevel::VenuePerimeter]);
    closed.is_active = false;
    let now = at("2025-05-15T16:00:00Z");

    let err = services
        .scanner
        .scan(scan_of(qr::encode(&credential, now).to_json().unwrap(), &closed), now)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::InactiveAccessPoint(ref name) if name == "Old Gate"));
    assert_eq!(store.inner.access_log_len(), 0);
    assert_eq!(services.scanner.metrics().snapshot().scans, 0);
}

// =========================================================================
// Issuance
// =========================================================================

#[tokio::test]
async fn test_credential_numbers_are_well_formed_and_unique() {
    let store = FaultyStore::new();
    let services = Services::new(store.clone(), ValidationPolicy::default());

    let mut seen = std::collections::HashSet::new();
    for _ in 0..25 {
        let credential = issued(&services, &[AccessLevel::GeneralAdmission]).await;
        let number = credential.credential_number.as_str().to_string();
        assert!(CredentialNumber::new(number.clone()).is_ok(), "{}", number);
        assert!(number.starts_with("B12-2025-"));
        assert_eq!(credential.credential_number.year(), at("2025-05-01T12:00:00Z").year());
        assert!(seen.insert(number));
    }
    assert_eq!(store.inner.credential_count(), 25);
}

#[tokio::test]
async fn test_issuance_snapshots_approved_levels() {
    let store = FaultyStore::new();
    let services = Services::new(store.clone(), ValidationPolicy::default());
    let (start, end) = tournament();
    let event = championship(start, end);

    let mut request = approved_request(
        &event,
        "Casey Morgan",
        &[AccessLevel::LockerRoom, AccessLevel::InterviewRoom],
    );
    request.approved_access_levels = Some([AccessLevel::InterviewRoom].into_iter().collect());

    let credential = services
        .issuer
        .issue(&admin(), &request, &event, at("2025-05-02T09:00:00Z"))
        .await
        .unwrap();
    assert_eq!(
        credential.access_levels.iter().copied().collect::<Vec<_>>(),
        vec![AccessLevel::InterviewRoom]
    );
    assert_eq!(credential.request_id, Some(request.id));
    assert_eq!(credential.issued_by.as_deref(), Some("conf-admin"));
    assert_eq!(credential.valid_until, at("2025-05-17T23:59:59Z"));

    let locker = AccessPoint::new("Locker Room", "Level 1", [AccessLevel::LockerRoom]);
    let now = at("2025-05-15T12:00:00Z");
    let decision = services
        .scanner
        .scan(scan_of(qr::encode(&credential, now).to_json().unwrap(), &locker), now)
        .await
        .unwrap();
    assert_eq!(decision.reason, Some(DenialReason::InsufficientAccess));
}
