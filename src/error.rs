//! Error handling for the sitewatch server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed request payload (bad data-URL, bad form field, empty file)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Bytes did not parse as a supported raster format
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// A required detection model is not loaded
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Image encoding failure
    #[error("Codec error: {0}")]
    Codec(String),

    /// Inference backend failure
    #[error("Inference error: {0}")]
    Inference(String),

    /// Upstream source failure (camera stream, collaborator service)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone()),
            Error::InvalidImage(msg) => (StatusCode::BAD_REQUEST, "INVALID_IMAGE", msg.clone()),
            Error::ModelUnavailable(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "MODEL_UNAVAILABLE",
                msg.clone(),
            ),
            Error::Codec(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CODEC_ERROR",
                msg.clone(),
            ),
            Error::Inference(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INFERENCE_ERROR",
                msg.clone(),
            ),
            Error::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg.clone()),
            Error::Serialization(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERIALIZATION_ERROR",
                e.to_string(),
            ),
            Error::Http(e) => (StatusCode::BAD_GATEWAY, "HTTP_ERROR", e.to_string()),
            Error::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR", e.to_string()),
            Error::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}
