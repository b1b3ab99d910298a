//! HTTP API server for the Gatepass node.
//!
//! Provides REST endpoints for championship events, credential requests,
//! access points, credential issuance and lifecycle, QR codes, scanning, and
//! the access log. The acting user is read from the `x-actor-id` and
//! `x-actor-role` headers.

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use gatepass_core::{
    AccessLevel, AccessLogEntry, AccessPoint, AuthSession, ChampionshipEvent, CoreError,
    Coordinates, Credential, CredentialRequest, CredentialStatus, OperatingHours, RequestStatus,
    Role, ValidationPolicy,
};
use gatepass_credentials::store::bounded;
use gatepass_credentials::{
    qr, CredentialError, MetricsSnapshot, QrPayload, ScanDecision, ScanError, ScanRequest,
    StoreError,
};

use crate::config::StorageBackend;
use crate::state::NodeState;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";

// --- Response types ---

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub backend: StorageBackend,
    pub uptime_secs: u64,
    pub metrics: MetricsSnapshot,
    pub validation: ValidationPolicy,
}

#[derive(Serialize)]
pub struct QrResponse {
    pub payload: QrPayload,
    /// The exact string encoded in the QR image.
    pub encoded: String,
}

#[derive(Serialize)]
pub struct AccessLogResponse {
    pub entries: Vec<AccessLogEntry>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct AccessPointsResponse {
    pub access_points: Vec<AccessPoint>,
    pub count: usize,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

// --- Request types ---

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub venue: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct CreateCredentialRequest {
    pub holder_name: String,
    pub holder_title: String,
    #[serde(default)]
    pub organization_name: Option<String>,
    pub event_id: Uuid,
    pub requested_access_levels: BTreeSet<AccessLevel>,
    #[serde(default)]
    pub approved_access_levels: Option<BTreeSet<AccessLevel>>,
    /// Anything other than `pending` requires an admin.
    #[serde(default)]
    pub status: Option<RequestStatus>,
}

#[derive(Deserialize)]
pub struct OperatingHoursInput {
    pub start_hour: u8,
    pub end_hour: u8,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

#[derive(Deserialize)]
pub struct CreateAccessPointRequest {
    pub name: String,
    #[serde(default)]
    pub location: String,
    pub required_access_levels: Vec<AccessLevel>,
    #[serde(default)]
    pub operating_hours: Option<OperatingHoursInput>,
    #[serde(default)]
    pub event_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct IssueCredentialRequest {
    pub request_id: Uuid,
}

#[derive(Deserialize, Default)]
pub struct RevokeCredentialRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QrFormat {
    #[default]
    Json,
    Svg,
}

#[derive(Deserialize)]
pub struct QrQuery {
    #[serde(default)]
    pub format: QrFormat,
}

#[derive(Deserialize)]
pub struct ScanBody {
    pub payload: String,
    pub access_point_id: Uuid,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

// --- Errors ---

pub type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn store_error(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::DuplicateCredentialNumber(_) => StatusCode::CONFLICT,
        StoreError::Unavailable(_) | StoreError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "record store failure");
    }
    api_error(status, e)
}

fn credential_error(e: CredentialError) -> ApiError {
    let status = match e {
        CredentialError::Store(inner) => return store_error(inner),
        CredentialError::Unauthorized(_) => StatusCode::FORBIDDEN,
        CredentialError::RequestNotApproved { .. }
        | CredentialError::EventMismatch(_)
        | CredentialError::NoAccessLevels(_)
        | CredentialError::MissingEventDates(_)
        | CredentialError::InvalidEventDates(_)
        | CredentialError::MalformedPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CredentialError::NumberSpaceExhausted(_) => StatusCode::CONFLICT,
        CredentialError::QrRender(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CredentialError::Core(CoreError::InvalidStateTransition { .. }) => StatusCode::CONFLICT,
        CredentialError::Core(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    api_error(status, e)
}

// --- Actor extraction ---

/// The authenticated actor behind a request.
pub struct Actor(pub AuthSession);

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor_id = header_value(parts, ACTOR_ID_HEADER).ok_or_else(|| {
            api_error(StatusCode::UNAUTHORIZED, "missing x-actor-id header")
        })?;
        let role: Role = header_value(parts, ACTOR_ROLE_HEADER)
            .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "missing x-actor-role header"))?
            .parse()
            .map_err(|e: CoreError| api_error(StatusCode::UNAUTHORIZED, e))?;

        let mut session = AuthSession::new(actor_id, role);
        if let Some(name) = header_value(parts, ACTOR_NAME_HEADER) {
            session = session.with_display_name(name);
        }
        Ok(Actor(session))
    }
}

fn require_admin(session: &AuthSession) -> Result<(), ApiError> {
    if session.can_administer() {
        Ok(())
    } else {
        Err(api_error(
            StatusCode::FORBIDDEN,
            format!("actor {} is not an admin", session.actor_id),
        ))
    }
}

// --- Handlers ---

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

async fn handle_status(State(state): State<Arc<NodeState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.backend,
        uptime_secs: state.start_time.elapsed().as_secs(),
        metrics: state.scanner.metrics().snapshot(),
        validation: state.policy.clone(),
    })
}

async fn handle_create_event(
    State(state): State<Arc<NodeState>>,
    Actor(session): Actor,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<ChampionshipEvent> {
    require_admin(&session)?;
    let event = ChampionshipEvent {
        id: Uuid::now_v7(),
        name: req.name,
        venue: req.venue,
        start_date: req.start_date,
        end_date: req.end_date,
    };
    if event.start_date.is_some() {
        event
            .validity_window()
            .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))?;
    }

    bounded(state.policy.store_timeout(), state.store.put_event(&event))
        .await
        .map_err(store_error)?;
    tracing::info!(event_id = %event.id, name = %event.name, "championship event created");
    Ok(Json(event))
}

async fn handle_create_request(
    State(state): State<Arc<NodeState>>,
    Actor(session): Actor,
    Json(req): Json<CreateCredentialRequest>,
) -> ApiResult<CredentialRequest> {
    let status = req.status.unwrap_or(RequestStatus::Pending);
    if status != RequestStatus::Pending || req.approved_access_levels.is_some() {
        require_admin(&session)?;
    }

    let timeout = state.policy.store_timeout();
    bounded(timeout, state.store.get_event(req.event_id))
        .await
        .map_err(store_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("event {}", req.event_id)))?;

    let request = CredentialRequest {
        id: Uuid::now_v7(),
        holder_name: req.holder_name,
        holder_title: req.holder_title,
        organization_name: req.organization_name,
        event_id: req.event_id,
        requested_access_levels: req.requested_access_levels,
        approved_access_levels: req.approved_access_levels,
        status,
    };
    bounded(timeout, state.store.put_request(&request))
        .await
        .map_err(store_error)?;
    tracing::info!(request_id = %request.id, %status, submitted_by = %session.actor_id, "credential request recorded");
    Ok(Json(request))
}

async fn handle_create_access_point(
    State(state): State<Arc<NodeState>>,
    Actor(session): Actor,
    Json(req): Json<CreateAccessPointRequest>,
) -> ApiResult<AccessPoint> {
    require_admin(&session)?;
    let mut access_point = AccessPoint::new(req.name, req.location, req.required_access_levels);
    if let Some(hours) = req.operating_hours {
        let hours = OperatingHours::new(hours.start_hour, hours.end_hour, hours.utc_offset_minutes)
            .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))?;
        access_point = access_point.with_operating_hours(hours);
    }
    if let Some(event_id) = req.event_id {
        access_point = access_point.for_event(event_id);
    }

    bounded(
        state.policy.store_timeout(),
        state.store.put_access_point(&access_point),
    )
    .await
    .map_err(store_error)?;
    tracing::info!(access_point_id = %access_point.id, name = %access_point.name, "access point created");
    Ok(Json(access_point))
}

async fn handle_list_access_points(
    State(state): State<Arc<NodeState>>,
    Actor(_): Actor,
) -> ApiResult<AccessPointsResponse> {
    let access_points = bounded(
        state.policy.store_timeout(),
        state.store.active_access_points(),
    )
    .await
    .map_err(store_error)?;
    let count = access_points.len();
    Ok(Json(AccessPointsResponse {
        access_points,
        count,
    }))
}

async fn handle_issue_credential(
    State(state): State<Arc<NodeState>>,
    Actor(session): Actor,
    Json(req): Json<IssueCredentialRequest>,
) -> ApiResult<Credential> {
    state
        .issuer
        .issue_for_request(&session, req.request_id, Utc::now())
        .await
        .map(Json)
        .map_err(credential_error)
}

async fn load_credential(state: &NodeState, id: Uuid) -> Result<Credential, ApiError> {
    bounded(state.policy.store_timeout(), state.store.get_credential(id))
        .await
        .map_err(store_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("credential {}", id)))
}

async fn handle_get_credential(
    State(state): State<Arc<NodeState>>,
    Actor(_): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Credential> {
    load_credential(&state, id).await.map(Json)
}

async fn handle_revoke_credential(
    State(state): State<Arc<NodeState>>,
    Actor(session): Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<RevokeCredentialRequest>,
) -> ApiResult<Credential> {
    state
        .issuer
        .revoke(&session, id, req.reason, Utc::now())
        .await
        .map(Json)
        .map_err(credential_error)
}

async fn handle_expire_credential(
    State(state): State<Arc<NodeState>>,
    Actor(session): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<Credential> {
    state
        .issuer
        .expire(&session, id)
        .await
        .map(Json)
        .map_err(credential_error)
}

async fn handle_credential_qr(
    State(state): State<Arc<NodeState>>,
    Actor(_): Actor,
    Path(id): Path<Uuid>,
    Query(query): Query<QrQuery>,
) -> Result<Response, ApiError> {
    let credential = load_credential(&state, id).await?;
    if credential.status != CredentialStatus::Active {
        return Err(api_error(
            StatusCode::CONFLICT,
            format!("credential {} is {}", id, credential.status),
        ));
    }

    let payload = qr::encode(&credential, Utc::now());
    match query.format {
        QrFormat::Json => {
            let encoded = payload.to_json().map_err(credential_error)?;
            Ok(Json(QrResponse { payload, encoded }).into_response())
        }
        QrFormat::Svg => {
            let svg = qr::render_svg(&payload).map_err(credential_error)?;
            Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
        }
    }
}

async fn handle_access_log(
    State(state): State<Arc<NodeState>>,
    Actor(_): Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<AccessLogResponse> {
    let entries = bounded(state.policy.store_timeout(), state.store.access_log_for(id))
        .await
        .map_err(store_error)?;
    let count = entries.len();
    Ok(Json(AccessLogResponse { entries, count }))
}

async fn handle_scan(
    State(state): State<Arc<NodeState>>,
    Actor(session): Actor,
    Json(req): Json<ScanBody>,
) -> ApiResult<ScanDecision> {
    let access_point = bounded(
        state.policy.store_timeout(),
        state.store.get_access_point(req.access_point_id),
    )
    .await
    .map_err(store_error)?
    .ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("access point {}", req.access_point_id),
        )
    })?;

    let request = ScanRequest {
        raw_payload: req.payload,
        access_point,
        session,
        device_id: req.device_id,
        coordinates: req.coordinates,
    };

    match state.scanner.scan(request, Utc::now()).await {
        Ok(decision) => Ok(Json(decision)),
        Err(e @ ScanError::InactiveAccessPoint(_)) => {
            Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e))
        }
        Err(e @ ScanError::Infrastructure(_)) => {
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, e))
        }
    }
}

async fn handle_metrics(State(state): State<Arc<NodeState>>) -> Result<Response, ApiError> {
    let body = state
        .scanner
        .metrics()
        .gather_and_encode()
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

// --- Server ---

pub fn build_router(state: Arc<NodeState>) -> Router {
    let mut router = Router::new()
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/status", get(handle_status))
        .route("/api/v1/events", post(handle_create_event))
        .route("/api/v1/requests", post(handle_create_request))
        .route(
            "/api/v1/access-points",
            get(handle_list_access_points).post(handle_create_access_point),
        )
        .route("/api/v1/credentials/issue", post(handle_issue_credential))
        .route("/api/v1/credentials/{id}", get(handle_get_credential))
        .route(
            "/api/v1/credentials/{id}/revoke",
            post(handle_revoke_credential),
        )
        .route(
            "/api/v1/credentials/{id}/expire",
            post(handle_expire_credential),
        )
        .route("/api/v1/credentials/{id}/qr", get(handle_credential_qr))
        .route(
            "/api/v1/credentials/{id}/access-log",
            get(handle_access_log),
        )
        .route("/api/v1/scan", post(handle_scan));

    // Scrape endpoint sits outside /api/v1 and needs no actor.
    if state.metrics_endpoint {
        router = router.route("/metrics", get(handle_metrics));
    }
    router.with_state(state)
}

pub async fn start_api_server(
    listener: tokio::net::TcpListener,
    state: Arc<NodeState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listen_addr = listener.local_addr()?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
