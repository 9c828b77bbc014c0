//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod covers;
#[allow(clippy::missing_errors_doc)]
pub mod engine;
#[allow(clippy::missing_errors_doc)]
pub mod sensors;
pub mod sse;

use axum::Router;
use axum::routing::{get, post, put};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Covers
        .route("/covers", get(covers::list))
        .route("/covers/{id}", get(covers::get))
        .route(
            "/covers/{id}/manual_override",
            post(covers::set_manual_override).delete(covers::clear_manual_override),
        )
        .route("/covers/{id}/activate_shading", post(covers::activate_shading))
        .route("/covers/{id}/force_action", post(covers::force_action))
        .route(
            "/covers/{id}/automation",
            get(covers::automation).put(covers::set_automation),
        )
        .route("/covers/{id}/moved", post(covers::moved))
        .route("/covers/{id}/evaluate", post(covers::evaluate))
        // Sensors
        .route("/sensors/{entity}", put(sensors::update))
        // Engine switch
        .route("/enabled", get(engine::get).put(engine::set))
        // Diagnostics
        .route("/diagnostics", get(covers::diagnostics))
        .route("/diagnostics/stream", get(sse::stream))
}
