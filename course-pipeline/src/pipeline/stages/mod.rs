mod chunking;
mod corpus;
mod summarize;
mod synthesize;
mod validation;

pub use chunking::{expected_chunk_count, split_into_chunks};
pub use corpus::assemble_corpus;
pub use summarize::{build_summary_prompt, condense};
pub use synthesize::{build_synthesis_prompt, synthesize};
pub use validation::validate_inputs;

use common::error::AppError;
use state_machines::core::GuardError;
use tracing::warn;

use super::{config::RetryPolicy, context::PipelineContext};
use crate::types::{ErrorClass, GenerationOutcome, GenerationRequest};

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::InternalError(format!(
        "invalid course pipeline transition during {event}: {guard:?}"
    ))
}

/// Converts a non-retryable generation failure into the run-level error.
fn fatal_generation_error(class: ErrorClass, message: String) -> AppError {
    match class {
        ErrorClass::QuotaExceeded => AppError::QuotaExceeded(message),
        ErrorClass::Timeout => AppError::GenerationTimeout(message),
        ErrorClass::RateLimited | ErrorClass::Unknown => AppError::Processing(message),
    }
}

/// Result of driving one request through a retry policy.
struct PolicyOutcome {
    text: Option<String>,
    attempts: u32,
    last_failure: Option<(ErrorClass, String)>,
}

/// Drives one logical generation through `policy`. Fatal classes end the run
/// immediately; retryable ones back off until the attempt budget is spent.
/// A success shorter than `min_chars` is treated as an unknown failure.
async fn generate_with_policy(
    ctx: &mut PipelineContext<'_>,
    request: &GenerationRequest,
    policy: &RetryPolicy,
    min_chars: usize,
) -> Result<PolicyOutcome, AppError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0_u32;

    loop {
        attempts = attempts.saturating_add(1);

        let (class, message) = match ctx.generate(request).await {
            GenerationOutcome::Success(text) if text.trim().chars().count() >= min_chars => {
                return Ok(PolicyOutcome {
                    text: Some(text),
                    attempts,
                    last_failure: None,
                });
            }
            GenerationOutcome::Success(text) => (
                ErrorClass::Unknown,
                format!("response too short ({} characters)", text.trim().chars().count()),
            ),
            GenerationOutcome::FatalFailure { class, message } => {
                return Err(fatal_generation_error(class, message));
            }
            GenerationOutcome::RetryableFailure { class, message } => (class, message),
        };

        warn!(
            run_id = %ctx.run_id,
            stage = request.stage.as_str(),
            attempt = attempts,
            max_attempts,
            error_class = class.as_str(),
            error = %message,
            "generation attempt failed"
        );

        if attempts >= max_attempts {
            return Ok(PolicyOutcome {
                text: None,
                attempts,
                last_failure: Some((class, message)),
            });
        }

        ctx.retries = ctx.retries.saturating_add(1);
        ctx.pause(policy.delay_for(class, attempts)).await?;
    }
}
