//! # HTTP Error Mapping
//!
//! Purpose: Convert the engine's transport-agnostic [`HkvError`] into an
//! axum response, matching the pack's `ErrorResponse { error: String }`
//! shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use hkv_common::HkvError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Wraps [`HkvError`] so this crate can provide the `IntoResponse` impl
/// (the orphan rule blocks implementing it directly on a foreign type).
pub struct ApiError(pub HkvError);

impl From<HkvError> for ApiError {
    fn from(err: HkvError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            HkvError::InvalidKey | HkvError::InvalidTTL => StatusCode::BAD_REQUEST,
            HkvError::NotFound => StatusCode::NOT_FOUND,
            HkvError::Shutdown => StatusCode::SERVICE_UNAVAILABLE,
        };
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
