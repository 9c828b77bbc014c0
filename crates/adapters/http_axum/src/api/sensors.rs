//! Sensor ingestion.

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use coverctl_domain::id::{CoverId, EntityRef};
use coverctl_domain::sensor::SensorValue;

use crate::error::ApiError;
use crate::state::AppState;

/// Covers woken up by a sensor update.
#[derive(Debug, Serialize)]
pub struct SensorUpdateResponse {
    pub triggered: Vec<CoverId>,
}

/// `PUT /api/sensors/{entity}`
///
/// The body is a tagged value, e.g. `{"type": "number", "value": 42000}`
/// or `{"type": "unavailable"}`.
pub async fn update(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Json(value): Json<SensorValue>,
) -> Result<Json<SensorUpdateResponse>, ApiError> {
    let entity = EntityRef::new(entity)?;
    let triggered = state.cover_service.handle_sensor_event(entity, value);
    Ok(Json(SensorUpdateResponse { triggered }))
}
