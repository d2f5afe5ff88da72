use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GenerationStage {
    Summarize,
    Synthesize,
}

impl GenerationStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Synthesize => "synthesize",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt_text: String,
    pub stage: GenerationStage,
}

impl GenerationRequest {
    pub fn summarize(prompt_text: String) -> Self {
        Self {
            prompt_text,
            stage: GenerationStage::Summarize,
        }
    }

    pub fn synthesize(prompt_text: String) -> Self {
        Self {
            prompt_text,
            stage: GenerationStage::Synthesize,
        }
    }
}

/// Failure classes reported by the generation client. Every failure maps to
/// exactly one of these at the client boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorClass {
    RateLimited,
    QuotaExceeded,
    Timeout,
    Unknown,
}

impl ErrorClass {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::QuotaExceeded => "quota_exceeded",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Success(String),
    RetryableFailure { class: ErrorClass, message: String },
    FatalFailure { class: ErrorClass, message: String },
}

impl GenerationOutcome {
    /// Builds the failure variant that matches the class's retry semantics.
    pub fn failure(class: ErrorClass, message: impl Into<String>) -> Self {
        let message = message.into();
        if class.is_retryable() {
            Self::RetryableFailure { class, message }
        } else {
            Self::FatalFailure { class, message }
        }
    }
}
