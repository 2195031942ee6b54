//! REST API handlers.
//!
//! Each handler delegates to the [`RolloutDriver`](hamal_rollout::RolloutDriver)
//! or its store and wraps the outcome in a consistent JSON envelope.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hamal_core::Project;
use hamal_rollout::RolloutError;
use tracing::info;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    /// Machine-readable error tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        })
    }
}

fn error_response(msg: &str, code: &'static str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
            code: Some(code),
        }),
    )
        .into_response()
}

fn invalid_param(msg: &str) -> Response {
    error_response(msg, "invalid_param", StatusCode::BAD_REQUEST)
}

/// Map a rollout error to its status code and tag. `AlreadyComplete` is
/// terminal success and answers 200 with the message as data.
fn failure(e: impl Into<RolloutError>) -> Response {
    let e = e.into();
    let (status, code) = match &e {
        RolloutError::AlreadyComplete => return ApiResponse::ok(e.to_string()).into_response(),
        RolloutError::ProjectNotFound(_) | RolloutError::AppNotFound { .. } => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        RolloutError::ProjectExists(_) => (StatusCode::CONFLICT, "already_exists"),
        RolloutError::InconsistentState { .. } => (StatusCode::CONFLICT, "inconsistent_state"),
        RolloutError::NothingToRollback { .. } => (StatusCode::CONFLICT, "nothing_to_rollback"),
        RolloutError::Orchestrator { .. } => (StatusCode::BAD_GATEWAY, "orchestrator_error"),
        RolloutError::Transport(_) => (StatusCode::SERVICE_UNAVAILABLE, "transport_error"),
    };
    error_response(&e.to_string(), code, status)
}

// ── Projects ───────────────────────────────────────────────────

/// GET /v1/hamal/ping
pub async fn ping() -> impl IntoResponse {
    ApiResponse::ok("success")
}

/// GET /v1/hamal/projects
pub async fn list_projects(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.driver.list().await)
}

/// GET /v1/hamal/projects/:name
pub async fn get_project(State(state): State<ApiState>, Path(name): Path<String>) -> Response {
    match state.driver.status(&name).await {
        Ok(view) => ApiResponse::ok(view).into_response(),
        Err(e) => failure(e),
    }
}

/// POST /v1/hamal/projects
pub async fn create_project(
    State(state): State<ApiState>,
    body: Result<Json<Project>, JsonRejection>,
) -> Response {
    let Json(project) = match body {
        Ok(body) => body,
        Err(e) => return invalid_param(&e.body_text()),
    };
    let name = project.name.clone();
    match state.driver.store().create(project) {
        Ok(()) => {
            info!(project = %name, "project registered");
            (StatusCode::CREATED, ApiResponse::ok(name)).into_response()
        }
        Err(e) => failure(e),
    }
}

/// PUT /v1/hamal/projects
pub async fn update_project(
    State(state): State<ApiState>,
    body: Result<Json<Project>, JsonRejection>,
) -> Response {
    let Json(project) = match body {
        Ok(body) => body,
        Err(e) => return invalid_param(&e.body_text()),
    };
    let name = project.name.clone();
    match state.driver.store().update(project) {
        Ok(()) => {
            info!(project = %name, "project plan replaced");
            ApiResponse::ok(name).into_response()
        }
        Err(e) => failure(e),
    }
}

/// DELETE /v1/hamal/projects/:name
pub async fn delete_project(State(state): State<ApiState>, Path(name): Path<String>) -> Response {
    match state.driver.store().delete(&name) {
        Ok(()) => {
            info!(project = %name, "project deleted");
            ApiResponse::ok("deleted").into_response()
        }
        Err(e) => failure(e),
    }
}

// ── Rollouts ───────────────────────────────────────────────────

/// Body of the advance and rollback requests.
#[derive(serde::Deserialize)]
pub struct RollRequest {
    #[serde(default)]
    pub app_id: String,
}

fn app_id(body: Result<Json<RollRequest>, JsonRejection>) -> Result<String, Response> {
    match body {
        Ok(Json(req)) if !req.app_id.is_empty() => Ok(req.app_id),
        Ok(_) => Err(invalid_param("invalid app_id")),
        Err(e) => Err(invalid_param(&e.body_text())),
    }
}

/// PUT /v1/hamal/projects/:name/rollingupdate
pub async fn rolling_update(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    body: Result<Json<RollRequest>, JsonRejection>,
) -> Response {
    let app_id = match app_id(body) {
        Ok(app_id) => app_id,
        Err(resp) => return resp,
    };
    match state.driver.advance(&name, &app_id).await {
        Ok(advance) => ApiResponse::ok(advance).into_response(),
        Err(e) => failure(e),
    }
}

/// PUT /v1/hamal/projects/:name/rollback
pub async fn rollback(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    body: Result<Json<RollRequest>, JsonRejection>,
) -> Response {
    let app_id = match app_id(body) {
        Ok(app_id) => app_id,
        Err(resp) => return resp,
    };
    match state.driver.rollback(&name, &app_id).await {
        Ok(()) => ApiResponse::ok("success").into_response(),
        Err(e) => failure(e),
    }
}

// ── Orchestrator passthrough ───────────────────────────────────

/// GET /v1/hamal/apps/:app_id
pub async fn get_app(State(state): State<ApiState>, Path(app_id): Path<String>) -> Response {
    match state.driver.orchestrator().get_app(&app_id).await {
        Ok(app) => ApiResponse::ok(app).into_response(),
        Err(e) => failure(e),
    }
}

/// GET /v1/hamal/apps/:app_id/versions
pub async fn get_app_versions(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
) -> Response {
    match state.driver.orchestrator().get_versions(&app_id).await {
        Ok(versions) => ApiResponse::ok(versions).into_response(),
        Err(e) => failure(e),
    }
}
