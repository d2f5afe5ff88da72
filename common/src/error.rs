use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Budget exceeded: {0}")]
    BudgetExceeded(String),
    #[error("No readable content could be extracted from the uploaded files")]
    NoReadableContent,
    #[error("Insufficient content: extracted {chars} characters, at least {min} required")]
    InsufficientContent { chars: usize, min: usize },
    #[error("Generation quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("Generation timed out: {0}")]
    GenerationTimeout(String),
    #[error("Processing error: {0}")]
    Processing(String),
    #[error("Course synthesis error: {0}")]
    Synthesis(String),
    #[error("Request cancelled before completion")]
    Cancelled,
    #[error("Extraction error: {0}")]
    Extraction(String),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Stable identifier reported alongside failed pipeline results.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::BudgetExceeded(_) => "budget_exceeded",
            Self::NoReadableContent => "no_readable_content",
            Self::InsufficientContent { .. } => "insufficient_content",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::GenerationTimeout(_) => "generation_timeout",
            Self::Processing(_) => "processing_failed",
            Self::Synthesis(_) => "synthesis_failed",
            Self::Cancelled => "cancelled",
            Self::Extraction(_) => "extraction_failed",
            Self::Config(_)
            | Self::OpenAI(_)
            | Self::Base64(_)
            | Self::Join(_)
            | Self::Io(_)
            | Self::InternalError(_) => "internal_error",
        }
    }

    /// True for failures caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::BudgetExceeded(_) | Self::Base64(_)
        )
    }
}
