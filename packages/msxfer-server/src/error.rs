//! Request-level error type, mapped to HTTP responses at the boundary.
//!
//! Registry/codec errors from `msxfer-core` are translated here rather
//! than leaking their internal shape to callers — handlers return
//! `Result<_, ApiError>` and axum dispatches on `IntoResponse`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or empty header: {0}")]
    MissingHeader(&'static str),

    #[error("transfer id already in use: {0}")]
    Conflict(String),

    #[error("unknown transfer id: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<msxfer_core::Error> for ApiError {
    fn from(e: msxfer_core::Error) -> Self {
        match e {
            msxfer_core::Error::Conflict(id) => ApiError::Conflict(id),
            msxfer_core::Error::NotFound(id) => ApiError::NotFound(id),
            msxfer_core::Error::Io(io) => ApiError::Io(io),
            msxfer_core::Error::Codec(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Io(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
