//! API errors with JSON bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use medscan_qa::QaError;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream service failed: {0}")]
    BadGateway(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            ApiError::BadGateway(detail) => {
                tracing::warn!(detail, "upstream failure");
                (StatusCode::BAD_GATEWAY, detail)
            }
            ApiError::Unavailable(detail) => (StatusCode::SERVICE_UNAVAILABLE, detail),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Se produjo un error interno".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<QaError> for ApiError {
    fn from(e: QaError) -> Self {
        match e {
            QaError::EmptyQuestion => ApiError::BadRequest("Falta la pregunta".into()),
            QaError::NoSources => ApiError::NotFound("No hay PDFs cargados para consultar".into()),
            QaError::Transport(_) | QaError::Status { .. } | QaError::InvalidResponse(_) => {
                ApiError::BadGateway(e.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}
