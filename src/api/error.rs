//! API error types with structured JSON responses.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::analyzer::AnalysisError;
use crate::pipeline::extraction::ExtractionError;

pub const UPLOAD_IN_PROGRESS_MESSAGE: &str =
    "Upload in progress. Please wait for the current analysis to finish.";

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Upload already in progress")]
    UploadInProgress,
    #[error("Request body too large")]
    PayloadTooLarge,
    #[error("Unsupported file: {0}")]
    UnsupportedMedia(String),
    #[error("Unprocessable report: {0}")]
    Unprocessable(String),
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64 },
    #[error("Analysis service error: {0}")]
    BadGateway(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::UploadInProgress => (
                StatusCode::CONFLICT,
                "UPLOAD_IN_PROGRESS",
                UPLOAD_IN_PROGRESS_MESSAGE.to_string(),
            ),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "The uploaded file is too large".to_string(),
            ),
            ApiError::UnsupportedMedia(detail) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_FORMAT",
                detail.clone(),
            ),
            ApiError::Unprocessable(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NO_EXTRACTABLE_TEXT",
                detail.clone(),
            ),
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Rate limit exceeded. Retry after {retry_after}s"),
            ),
            ApiError::BadGateway(detail) => {
                tracing::warn!(detail, "Narrative provider failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "ANALYSIS_UNAVAILABLE",
                    "The analysis service is unavailable. Please try again later.".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after } = &self {
            if let Ok(val) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::NoExtractableText => ApiError::Unprocessable(err.to_string()),
            AnalysisError::Narrative(e) => ApiError::BadGateway(e.to_string()),
            AnalysisError::Extraction(e) => e.into(),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnsupportedFormat => ApiError::UnsupportedMedia(
                "Unsupported file type. Please upload a PDF, an image, or a text file.".into(),
            ),
            ExtractionError::PdfiumUnavailable(detail) => ApiError::Internal(detail),
            ExtractionError::PdfEncrypted
            | ExtractionError::PdfParsing(_)
            | ExtractionError::EncodingError(_)
            | ExtractionError::EmptyDocument => ApiError::Unprocessable(err.to_string()),
        }
    }
}
