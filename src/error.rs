//! Request-level error taxonomy and the single error-to-response boundary.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong while producing a caption. The client always
/// sees a uniform `{"error": ...}` body; the variant determines the status
/// code and how the failure is logged.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No image provided")]
    MissingImage,
    #[error("failed to read upload: {0}")]
    Upload(#[from] MultipartError),
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("caption generation failed: {0}")]
    Caption(#[source] anyhow::Error),
    #[error("translation failed: {0}")]
    Translation(#[source] anyhow::Error),
    #[error("speech synthesis failed: {0}")]
    Synthesis(#[source] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingImage => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Pipeline stage tag used in logs to tell input failures apart from
    /// external-service failures.
    pub fn stage(&self) -> &'static str {
        match self {
            ApiError::MissingImage => "validate",
            ApiError::Upload(_) => "upload",
            ApiError::ImageDecode(_) => "decode",
            ApiError::Caption(_) => "inference",
            ApiError::Translation(_) => "translate",
            ApiError::Synthesis(_) => "synthesize",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            tracing::warn!(stage = self.stage(), error = %self, "rejected caption request");
        } else {
            tracing::error!(stage = self.stage(), error = %self, "caption request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
