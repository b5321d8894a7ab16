//! API error type. Every failure a handler can return maps to one status
//! class; 5xx variants carry a fixed message and their detail is logged by
//! the handler, never sent to the client.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use mediaviewer_types::api::ErrorResponse;
use mediaviewer_types::metadata::MetadataError;

use crate::homeserver::ResolveError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to decode request JSON")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Failed to decode metadata: {0}")]
    Validation(#[from] MetadataError),

    #[error("Incorrect authentication key")]
    Unauthorized,

    #[error("File not found")]
    NotFound,

    #[error("Failed to resolve homeserver URL")]
    Resolution(#[source] ResolveError),

    #[error("{0}")]
    Storage(&'static str),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidJson(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Resolution(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
