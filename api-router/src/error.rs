use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::error::AppError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, Clone)]
pub enum ApiError {
    #[error("Internal server error")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Processing error: {0}")]
    ProcessingError(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) | AppError::BudgetExceeded(msg) => Self::ValidationError(msg),
            AppError::Base64(_) => {
                Self::ValidationError("File data must be valid base64".to_string())
            }
            AppError::QuotaExceeded(_) => Self::QuotaExceeded(
                "The generation service quota is exhausted. Please try again later".to_string(),
            ),
            AppError::GenerationTimeout(_) => Self::Timeout(
                "Course generation timed out. Please try again with less content".to_string(),
            ),
            AppError::Processing(msg) => Self::ProcessingError(msg),
            AppError::NoReadableContent | AppError::InsufficientContent { .. } => {
                Self::ProcessingError(err.to_string())
            }
            AppError::Synthesis(_) | AppError::Extraction(_) => {
                tracing::error!("Course generation failed: {:?}", err);
                Self::ProcessingError("Failed to generate course content".to_string())
            }
            AppError::Cancelled => Self::Cancelled,
            AppError::Config(_)
            | AppError::OpenAI(_)
            | AppError::Join(_)
            | AppError::Io(_)
            | AppError::InternalError(_) => {
                tracing::error!("Internal error: {:?}", err);
                Self::InternalError("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InternalError(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            Self::ValidationError(message) => (StatusCode::BAD_REQUEST, message),
            Self::QuotaExceeded(message) => (StatusCode::TOO_MANY_REQUESTS, message),
            Self::Timeout(message) => (StatusCode::REQUEST_TIMEOUT, message),
            Self::ProcessingError(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            Self::Cancelled => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Request cancelled".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: message,
            status: "error".to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
}
