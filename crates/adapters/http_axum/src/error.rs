//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use coverctl_domain::error::{CoverError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`CoverError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(CoverError);

impl From<CoverError> for ApiError {
    fn from(err: CoverError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoverError::Validation(_) => StatusCode::BAD_REQUEST,
            CoverError::InvalidCommand(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoverError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        if status != StatusCode::NOT_FOUND {
            tracing::debug!(error = %self.0, "rejected request");
        }

        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
