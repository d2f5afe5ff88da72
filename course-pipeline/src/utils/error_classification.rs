use async_openai::error::OpenAIError;

use crate::types::ErrorClass;

const QUOTA_MARKERS: &[&str] = &["insufficient_quota", "billing_hard_limit_reached", "billing_not_active"];
const RATE_LIMIT_MARKERS: &[&str] = &["rate_limit_exceeded", "rate_limit_error", "requests", "tokens"];
const TIMEOUT_MARKERS: &[&str] = &["timeout", "request_timeout"];

/// Maps a client error onto exactly one error class. This is the only place
/// provider errors are inspected; callers switch on the returned class.
pub fn classify_openai_error(error: &OpenAIError) -> ErrorClass {
    match error {
        OpenAIError::ApiError(api_error) => {
            classify_api_error(api_error.code.as_deref(), api_error.r#type.as_deref())
        }
        OpenAIError::Reqwest(err) if err.is_timeout() => ErrorClass::Timeout,
        _ => ErrorClass::Unknown,
    }
}

/// Classifies the structured `code`/`type` pair reported by the provider.
/// Quota wins over rate limiting because the provider reports quota exhaustion
/// on the same HTTP status as throttling.
pub fn classify_api_error(code: Option<&str>, kind: Option<&str>) -> ErrorClass {
    let matches_any = |markers: &[&str]| {
        [code, kind]
            .into_iter()
            .flatten()
            .any(|value| markers.iter().any(|marker| value.eq_ignore_ascii_case(marker)))
    };

    if matches_any(QUOTA_MARKERS) {
        ErrorClass::QuotaExceeded
    } else if matches_any(RATE_LIMIT_MARKERS) {
        ErrorClass::RateLimited
    } else if matches_any(TIMEOUT_MARKERS) {
        ErrorClass::Timeout
    } else {
        ErrorClass::Unknown
    }
}
