//! Global automation switch.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct EngineState {
    pub enabled: bool,
}

/// `GET /api/enabled`
pub async fn get(State(state): State<AppState>) -> Json<EngineState> {
    Json(EngineState {
        enabled: state.cover_service.is_enabled(),
    })
}

/// `PUT /api/enabled`
pub async fn set(
    State(state): State<AppState>,
    Json(req): Json<EngineState>,
) -> Json<EngineState> {
    state.cover_service.set_enabled(req.enabled);
    Json(EngineState {
        enabled: state.cover_service.is_enabled(),
    })
}

#[cfg(test)]
mod tests {
    use crate::router::build;
    use crate::test_support::{json_body, test_state};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn should_toggle_automation() {
        let app = build(test_state());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/enabled").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await["enabled"], false);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::PUT)
                    .uri("/api/enabled")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"enabled": true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["enabled"], true);
    }
}
