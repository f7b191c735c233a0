use api_types::ErrorResponse;
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("no file uploaded")]
    NoFile,
    #[error("multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("failed to list images: {0}")]
    List(#[source] StorageError),
    #[error("failed to store upload: {0}")]
    Upload(#[source] StorageError),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("failed to resolve download URL: {0}")]
    Download(#[source] StorageError),
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NoFile => (StatusCode::BAD_REQUEST, "No file uploaded"),
            ApiError::Multipart(e) => {
                tracing::warn!(error = %e, "rejected multipart body");
                let status = e.status();
                if status == StatusCode::PAYLOAD_TOO_LARGE {
                    (status, "File too large")
                } else {
                    (status, "Invalid upload")
                }
            }
            ApiError::List(e) => {
                tracing::error!(error = %e, "Error fetching images");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve images")
            }
            ApiError::Upload(StorageError::InvalidKey(key)) => {
                tracing::warn!(key = %key, "rejected upload key");
                (StatusCode::BAD_REQUEST, "Invalid file name")
            }
            ApiError::Upload(e) => {
                tracing::error!(error = %e, "Error uploading file");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload file")
            }
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "File not found"),
            ApiError::Download(e) => {
                tracing::error!(error = %e, "Error generating download URL");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate download URL")
            }
            ApiError::Metrics(e) => {
                tracing::error!(error = %e, "Error encoding metrics");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics")
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
