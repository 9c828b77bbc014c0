//! JSON REST handlers for covers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use coverctl_app::services::cover_service::CoverStatus;
use coverctl_domain::action::Action;
use coverctl_domain::config::Automation;
use coverctl_domain::diagnostics::Diagnostics;
use coverctl_domain::id::CoverId;
use coverctl_domain::time::Timestamp;

use crate::error::ApiError;
use crate::state::AppState;

/// A cover with its latest diagnostics.
#[derive(Debug, Serialize)]
pub struct CoverResponse {
    pub id: CoverId,
    pub name: String,
    pub manual_override_until: Option<Timestamp>,
    pub automation: Automation,
    pub diagnostics: Option<Diagnostics>,
}

impl From<CoverStatus> for CoverResponse {
    fn from(status: CoverStatus) -> Self {
        Self {
            id: status.id,
            name: status.name,
            manual_override_until: status.manual_override_until,
            automation: status.automation,
            diagnostics: status.diagnostics,
        }
    }
}

/// Request body for pausing automation.
#[derive(Deserialize)]
pub struct ManualOverrideRequest {
    pub minutes: i64,
}

/// Request body for forcing shading. Without `hold_minutes` the cover's
/// configured hold applies.
#[derive(Deserialize, Default)]
pub struct ActivateShadingRequest {
    #[serde(default)]
    pub hold_minutes: Option<i64>,
}

/// Request body for forcing a cover open or closed.
#[derive(Deserialize)]
pub struct ForceActionRequest {
    pub action: Action,
}

/// When automation resumes for a cover.
#[derive(Debug, Serialize)]
pub struct PauseResponse {
    pub until: Option<Timestamp>,
}

/// Possible responses from the command endpoints.
pub enum CommandResponse {
    Paused(Json<PauseResponse>),
    Accepted,
    NoContent,
}

impl IntoResponse for CommandResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Paused(json) => json.into_response(),
            Self::Accepted => StatusCode::ACCEPTED.into_response(),
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

fn cover_id(raw: String) -> Result<CoverId, ApiError> {
    CoverId::new(raw).map_err(ApiError::from)
}

/// `GET /api/covers`
pub async fn list(State(state): State<AppState>) -> Json<Vec<CoverResponse>> {
    let covers = state.cover_service.list_covers();
    Json(covers.into_iter().map(CoverResponse::from).collect())
}

/// `GET /api/covers/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CoverResponse>, ApiError> {
    let status = state.cover_service.get_cover(&cover_id(id)?)?;
    Ok(Json(status.into()))
}

/// `POST /api/covers/{id}/manual_override`
pub async fn set_manual_override(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ManualOverrideRequest>,
) -> Result<CommandResponse, ApiError> {
    let until = state
        .cover_service
        .set_manual_override(&cover_id(id)?, req.minutes)?;
    Ok(CommandResponse::Paused(Json(PauseResponse {
        until: Some(until),
    })))
}

/// `DELETE /api/covers/{id}/manual_override`
pub async fn clear_manual_override(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<CommandResponse, ApiError> {
    state.cover_service.clear_manual_override(&cover_id(id)?)?;
    Ok(CommandResponse::NoContent)
}

/// `POST /api/covers/{id}/activate_shading`
pub async fn activate_shading(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ActivateShadingRequest>,
) -> Result<CommandResponse, ApiError> {
    state
        .cover_service
        .activate_shading(&cover_id(id)?, req.hold_minutes)?;
    Ok(CommandResponse::Accepted)
}

/// `POST /api/covers/{id}/force_action`
pub async fn force_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ForceActionRequest>,
) -> Result<CommandResponse, ApiError> {
    let until = state
        .cover_service
        .force_action(&cover_id(id)?, req.action)?;
    Ok(CommandResponse::Paused(Json(PauseResponse { until })))
}

/// `GET /api/covers/{id}/automation`
pub async fn automation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Automation>, ApiError> {
    let status = state.cover_service.get_cover(&cover_id(id)?)?;
    Ok(Json(status.automation))
}

/// `PUT /api/covers/{id}/automation`: omitted switches default to on.
pub async fn set_automation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(automation): Json<Automation>,
) -> Result<Json<Automation>, ApiError> {
    state
        .cover_service
        .set_automation(&cover_id(id)?, automation)?;
    Ok(Json(automation))
}

/// `POST /api/covers/{id}/moved`: the cover was moved by hand.
pub async fn moved(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<CommandResponse, ApiError> {
    let until = state.cover_service.report_external_move(&cover_id(id)?)?;
    Ok(CommandResponse::Paused(Json(PauseResponse { until })))
}

/// `POST /api/covers/{id}/evaluate`
pub async fn evaluate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<CommandResponse, ApiError> {
    state.cover_service.evaluate(&cover_id(id)?)?;
    Ok(CommandResponse::Accepted)
}

/// `GET /api/diagnostics`: latest record of every evaluated cover.
pub async fn diagnostics(State(state): State<AppState>) -> Json<Vec<Diagnostics>> {
    Json(state.cover_service.board().all())
}
