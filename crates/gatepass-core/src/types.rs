use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::credential_state::CredentialStatus;
use crate::error::CoreError;

/// Conference prefix carried by every credential number.
pub const CREDENTIAL_NUMBER_PREFIX: &str = "B12";

/// Exclusive upper bound of the numeric credential suffix (six digits).
pub const CREDENTIAL_SUFFIX_LIMIT: u32 = 1_000_000;

/// A zone or privilege a credential can grant.
///
/// The vocabulary is fixed; the snake_case names are shared with the
/// dashboard and the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    FieldAccess,
    SidelineAccess,
    PressBox,
    InterviewRoom,
    LockerRoom,
    RestrictedAreas,
    GeneralAdmission,
    Backstage,
    VenuePerimeter,
    Parking,
}

impl AccessLevel {
    /// Every access level, in vocabulary order.
    pub const ALL: [AccessLevel; 10] = [
        Self::FieldAccess,
        Self::SidelineAccess,
        Self::PressBox,
        Self::InterviewRoom,
        Self::LockerRoom,
        Self::RestrictedAreas,
        Self::GeneralAdmission,
        Self::Backstage,
        Self::VenuePerimeter,
        Self::Parking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FieldAccess => "field_access",
            Self::SidelineAccess => "sideline_access",
            Self::PressBox => "press_box",
            Self::InterviewRoom => "interview_room",
            Self::LockerRoom => "locker_room",
            Self::RestrictedAreas => "restricted_areas",
            Self::GeneralAdmission => "general_admission",
            Self::Backstage => "backstage",
            Self::VenuePerimeter => "venue_perimeter",
            Self::Parking => "parking",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| CoreError::UnknownAccessLevel(s.to_string()))
    }
}

/// Human-readable credential number.
/// Format: `B12-<4-digit year>-<6-digit zero-padded number>`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialNumber(String);

impl CredentialNumber {
    /// Parse and validate a credential number string.
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        let mut parts = value.split('-');
        let well_formed = matches!(
            (parts.next(), parts.next(), parts.next(), parts.next()),
            (Some(prefix), Some(year), Some(suffix), None)
                if prefix == CREDENTIAL_NUMBER_PREFIX
                    && year.len() == 4
                    && year.bytes().all(|b| b.is_ascii_digit())
                    && suffix.len() == 6
                    && suffix.bytes().all(|b| b.is_ascii_digit())
        );
        if !well_formed {
            return Err(CoreError::InvalidCredentialNumber(format!(
                "expected '{}-YYYY-NNNNNN', got: {}",
                CREDENTIAL_NUMBER_PREFIX, value
            )));
        }
        Ok(Self(value))
    }

    /// Build a credential number from its year and numeric suffix.
    pub fn from_parts(year: i32, suffix: u32) -> Result<Self, CoreError> {
        if !(0..=9999).contains(&year) {
            return Err(CoreError::InvalidCredentialNumber(format!(
                "year out of range: {}",
                year
            )));
        }
        if suffix >= CREDENTIAL_SUFFIX_LIMIT {
            return Err(CoreError::InvalidCredentialNumber(format!(
                "suffix out of range: {}",
                suffix
            )));
        }
        Ok(Self(format!(
            "{}-{:04}-{:06}",
            CREDENTIAL_NUMBER_PREFIX, year, suffix
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The four-digit year component.
    pub fn year(&self) -> i32 {
        self.0[4..8].parse().unwrap_or_default()
    }

    /// The six-digit numeric component.
    pub fn suffix(&self) -> u32 {
        self.0[9..].parse().unwrap_or_default()
    }
}

impl fmt::Display for CredentialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CredentialNumber {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CredentialNumber> for String {
    fn from(number: CredentialNumber) -> Self {
        number.0
    }
}

/// Role of an authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Conference staff who review requests and manage credentials.
    Admin,
    /// Event staff with read access.
    Staff,
    /// Checkpoint operator running a scanner device.
    Scanner,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Staff => write!(f, "staff"),
            Self::Scanner => write!(f, "scanner"),
        }
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            "scanner" => Ok(Self::Scanner),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

/// The actor on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub actor_id: String,
    pub display_name: Option<String>,
    pub role: Role,
}

impl AuthSession {
    pub fn new(actor_id: impl Into<String>, role: Role) -> Self {
        Self {
            actor_id: actor_id.into(),
            display_name: None,
            role,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Whether this actor may issue, revoke, or expire credentials.
    pub fn can_administer(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Why a scan was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialReason {
    InvalidFormat,
    ExpiredQr,
    NotFound,
    Revoked,
    Expired,
    Denied,
    NotYetValid,
    InvalidHash,
    OutsideOperatingHours,
    InsufficientAccess,
}

impl DenialReason {
    /// Wire code, e.g. `EXPIRED_QR`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::ExpiredQr => "EXPIRED_QR",
            Self::NotFound => "NOT_FOUND",
            Self::Revoked => "REVOKED",
            Self::Expired => "EXPIRED",
            Self::Denied => "DENIED",
            Self::NotYetValid => "NOT_YET_VALID",
            Self::InvalidHash => "INVALID_HASH",
            Self::OutsideOperatingHours => "OUTSIDE_OPERATING_HOURS",
            Self::InsufficientAccess => "INSUFFICIENT_ACCESS",
        }
    }

    /// Operator-facing message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "Invalid QR code format",
            Self::ExpiredQr => "QR code has expired, ask the holder to refresh it",
            Self::NotFound => "Credential not found",
            Self::Revoked => "Credential has been revoked",
            Self::Expired => "Credential has expired",
            Self::Denied => "Credential was denied",
            Self::NotYetValid => "Credential is not yet valid",
            Self::InvalidHash => "Security hash mismatch",
            Self::OutsideOperatingHours => "Access point is closed at this hour",
            Self::InsufficientAccess => "Credential does not grant access to this area",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome category recorded in the access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessResult {
    Granted,
    Denied,
    Expired,
    Revoked,
    /// The attempt could not be evaluated because the store failed.
    Error,
}

impl AccessResult {
    /// Log category for a rejected scan.
    pub fn for_denial(reason: DenialReason) -> Self {
        match reason {
            DenialReason::Revoked => Self::Revoked,
            DenialReason::Expired | DenialReason::ExpiredQr => Self::Expired,
            _ => Self::Denied,
        }
    }
}

impl fmt::Display for AccessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::Expired => write!(f, "expired"),
            Self::Revoked => write!(f, "revoked"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// An issued access pass tied to one event and one holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: Uuid,
    pub credential_number: CredentialNumber,
    pub holder_name: String,
    pub holder_title: String,
    /// `None` for holders without an affiliated organization.
    pub organization_name: Option<String>,
    pub event_id: Uuid,
    pub access_levels: BTreeSet<AccessLevel>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub status: CredentialStatus,
    /// Request this credential was issued from.
    pub request_id: Option<Uuid>,
    pub issued_at: DateTime<Utc>,
    pub issued_by: Option<String>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<String>,
    pub revocation_reason: Option<String>,
}

impl Credential {
    /// Organization name for display.
    pub fn organization_display(&self) -> &str {
        self.organization_name.as_deref().unwrap_or("Independent")
    }

    /// Whether `now` lies within `[valid_from, valid_until]`.
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_from && now <= self.valid_until
    }

    pub fn grants(&self, level: AccessLevel) -> bool {
        self.access_levels.contains(&level)
    }
}

/// Daily opening window of an access point, in venue-local hours.
///
/// Both bounds are inclusive. A window whose start is after its end wraps
/// past midnight (e.g. 22-02).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingHours {
    pub start_hour: u8,
    pub end_hour: u8,
    /// Venue offset from UTC, in minutes.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl OperatingHours {
    pub fn new(start_hour: u8, end_hour: u8, utc_offset_minutes: i32) -> Result<Self, CoreError> {
        if start_hour > 23 || end_hour > 23 {
            return Err(CoreError::InvalidOperatingHours(format!(
                "hours must be 0-23, got {}-{}",
                start_hour, end_hour
            )));
        }
        if utc_offset_minutes.abs() > 14 * 60 {
            return Err(CoreError::InvalidOperatingHours(format!(
                "utc offset out of range: {} minutes",
                utc_offset_minutes
            )));
        }
        Ok(Self {
            start_hour,
            end_hour,
            utc_offset_minutes,
        })
    }

    /// Whether the venue-local hour at `now` falls within the window.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let local = now + Duration::minutes(i64::from(self.utc_offset_minutes));
        let hour = local.hour() as u8;
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour <= self.end_hour
        } else {
            hour >= self.start_hour || hour <= self.end_hour
        }
    }
}

/// A physical checkpoint at a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPoint {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    /// Any one of these levels admits the holder.
    pub required_access_levels: BTreeSet<AccessLevel>,
    pub operating_hours: Option<OperatingHours>,
    pub is_active: bool,
    pub event_id: Option<Uuid>,
}

impl AccessPoint {
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        required_access_levels: impl IntoIterator<Item = AccessLevel>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            location: location.into(),
            required_access_levels: required_access_levels.into_iter().collect(),
            operating_hours: None,
            is_active: true,
            event_id: None,
        }
    }

    pub fn with_operating_hours(mut self, hours: OperatingHours) -> Self {
        self.operating_hours = Some(hours);
        self
    }

    pub fn for_event(mut self, event_id: Uuid) -> Self {
        self.event_id = Some(event_id);
        self
    }
}

/// Geolocation reported by a scanning device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Immutable audit record of one scan attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub id: Uuid,
    /// The resolved credential. Absent for unparseable input and for
    /// payloads that did not match an issued credential.
    pub credential_id: Option<Uuid>,
    /// What an unresolved payload claimed to be, when it parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempted_credential_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempted_credential_number: Option<CredentialNumber>,
    pub event_id: Option<Uuid>,
    pub access_point_name: String,
    pub access_level_checked: Option<AccessLevel>,
    pub result: AccessResult,
    pub reason: Option<DenialReason>,
    pub scanned_by: Option<String>,
    pub device_id: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub timestamp: DateTime<Utc>,
}

/// Review status of a credential request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    UnderReview,
    Approved,
    Denied,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::UnderReview => write!(f, "under_review"),
            Self::Approved => write!(f, "approved"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// A request for championship credentials submitted by an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRequest {
    pub id: Uuid,
    pub holder_name: String,
    pub holder_title: String,
    pub organization_name: Option<String>,
    pub event_id: Uuid,
    pub requested_access_levels: BTreeSet<AccessLevel>,
    /// Set by the reviewer; may narrow the requested levels.
    pub approved_access_levels: Option<BTreeSet<AccessLevel>>,
    pub status: RequestStatus,
}

impl CredentialRequest {
    /// Access levels a credential issued from this request carries.
    pub fn granted_access_levels(&self) -> BTreeSet<AccessLevel> {
        self.approved_access_levels
            .clone()
            .unwrap_or_else(|| self.requested_access_levels.clone())
    }
}

/// A championship event credentials are issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChampionshipEvent {
    pub id: Uuid,
    pub name: String,
    pub venue: String,
    pub start_date: Option<NaiveDate>,
    /// `None` for single-day events.
    pub end_date: Option<NaiveDate>,
}

impl ChampionshipEvent {
    /// Credential validity window derived from the event dates:
    /// start of the first day through the last second of the final day, UTC.
    pub fn validity_window(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), CoreError> {
        let start = self.start_date.ok_or_else(|| {
            CoreError::InvalidValidityWindow(format!("event {} has no start date", self.id))
        })?;
        let end = self.end_date.unwrap_or(start);
        if end < start {
            return Err(CoreError::InvalidValidityWindow(format!(
                "event {} ends ({}) before it starts ({})",
                self.id, end, start
            )));
        }

        let from = start
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| CoreError::InvalidValidityWindow(start.to_string()))?
            .and_utc();
        let until = end
            .and_hms_opt(23, 59, 59)
            .ok_or_else(|| CoreError::InvalidValidityWindow(end.to_string()))?
            .and_utc();
        Ok((from, until))
    }

    /// Year of the event start, used in credential numbers.
    pub fn year(&self) -> Option<i32> {
        self.start_date.map(|d| d.year())
    }
}
