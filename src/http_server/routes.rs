//! Status HTTP Routes
//!
//! Thin adapters over [`WorkflowHooks`]. Authentication happens upstream; the
//! caller's identity arrives in the `x-actor-id` and `x-actor-role` headers.

use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::AuditRecord;
use crate::domain::{Actor, ModelVersion, Role};
use crate::errors::{EngineError, EngineResult};
use crate::status::{ParseStatusError, RequestStatus};
use crate::store::SqliteStore;
use crate::supersession::ActivationOutcome;
use crate::workflow::{RequestStatusOutcome, WorkflowHooks};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

pub type SharedHooks = Arc<WorkflowHooks<SqliteStore>>;

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn status_routes(hooks: SharedHooks) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/validation-requests/:id/status", post(change_status_handler))
        .route("/validation-requests/:id/decline", post(decline_handler))
        .route("/validation-requests/:id/approve", post(approve_handler))
        .route("/versions/:id", get(get_version_handler))
        .route("/versions/:id/activate", post(activate_handler))
        .route("/versions/:id/audit", get(audit_handler))
        .with_state(hooks)
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    /// Status label, case-insensitive
    pub status: String,
    #[serde(default)]
    pub trigger: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeclineRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub status: u16,
}

impl From<&EngineError> for ErrorResponse {
    fn from(err: &EngineError) -> Self {
        Self {
            error: err.to_string(),
            code: err.code().to_string(),
            status: err.status_code(),
        }
    }
}

fn api_error(err: EngineError) -> ApiError {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(&err)))
}

/// Run blocking store work off the async executor.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> EngineResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map(Json).map_err(api_error),
        Err(e) => Err(api_error(EngineError::persistence(format!("worker failed: {}", e)))),
    }
}

/// Identity from `x-actor-id` / `x-actor-role` (default role: user).
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let id = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| api_error(EngineError::validation(format!("missing {} header", ACTOR_ID_HEADER))))?;
    if id == Actor::SYSTEM_ID {
        return Err(api_error(EngineError::validation("the system actor cannot be impersonated")));
    }

    let role = match headers.get(ACTOR_ROLE_HEADER).and_then(|v| v.to_str().ok()) {
        Some(raw) => raw.parse::<Role>().map_err(api_error)?,
        None => Role::User,
    };

    Ok(Actor {
        id: id.to_string(),
        role,
    })
}

// ==================
// Handlers
// ==================

async fn health_handler() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    (StatusCode::OK, Json(response))
}

async fn metrics_handler(State(hooks): State<SharedHooks>) -> impl IntoResponse {
    Json(hooks.metrics().snapshot())
}

async fn change_status_handler(
    State(hooks): State<SharedHooks>,
    Path(request_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<ChangeStatusRequest>,
) -> ApiResult<RequestStatusOutcome> {
    let actor = actor_from_headers(&headers)?;
    let status: RequestStatus = body
        .status
        .parse()
        .map_err(|e: ParseStatusError| api_error(e.into()))?;
    blocking(move || hooks.change_request_status(request_id, status, &actor, body.trigger.as_deref()))
    .await
}

async fn decline_handler(
    State(hooks): State<SharedHooks>,
    Path(request_id): Path<Uuid>,
    headers: HeaderMap,
    body: Option<Json<DeclineRequest>>,
) -> ApiResult<RequestStatusOutcome> {
    let actor = actor_from_headers(&headers)?;
    let reason = body.and_then(|Json(b)| b.reason);
    blocking(move || hooks.decline_request(request_id, &actor, reason.as_deref())).await
}

async fn approve_handler(
    State(hooks): State<SharedHooks>,
    Path(request_id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<RequestStatusOutcome> {
    let actor = actor_from_headers(&headers)?;
    blocking(move || hooks.approve_request(request_id, &actor)).await
}

async fn activate_handler(
    State(hooks): State<SharedHooks>,
    Path(version_id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<ActivationOutcome> {
    let actor = actor_from_headers(&headers)?;
    blocking(move || hooks.activate_version(version_id, &actor)).await
}

async fn get_version_handler(
    State(hooks): State<SharedHooks>,
    Path(version_id): Path<Uuid>,
) -> ApiResult<ModelVersion> {
    blocking(move || hooks.get_version(version_id)).await
}

async fn audit_handler(
    State(hooks): State<SharedHooks>,
    Path(version_id): Path<Uuid>,
) -> ApiResult<Vec<AuditRecord>> {
    blocking(move || hooks.audit_trail(version_id)).await
}
