use common::{
    error::AppError,
    utils::ingest_limits::{
        check_estimated_size, validate_file_count, validate_source_file, IngestValidationError,
    },
};
use tracing::{debug, instrument};

use super::map_guard_error;
use crate::{
    pipeline::{
        context::PipelineContext,
        state::{CourseMachine, Ready, Validated},
    },
    types::SourceFile,
};

/// Checks the whole batch before any extraction. Every failing file is
/// reported in one error; nothing is extracted if any file fails.
#[instrument(level = "trace", skip_all, fields(run_id = %ctx.run_id, file_count = files.len()))]
pub fn validate_inputs(
    machine: CourseMachine<(), Ready>,
    ctx: &mut PipelineContext<'_>,
    files: &[SourceFile],
) -> Result<CourseMachine<(), Validated>, AppError> {
    let config = ctx.pipeline_config;
    let limits = &config.limits;
    ctx.source_count = files.len();

    validate_file_count(limits, files.len()).map_err(|err| AppError::Validation(err.to_string()))?;

    let reasons: Vec<String> = files
        .iter()
        .map(|file| {
            validate_source_file(limits, &file.name, &file.declared_mime_type, file.byte_size)
        })
        .filter_map(|verdict| verdict.reason)
        .collect();

    if !reasons.is_empty() {
        return Err(AppError::Validation(reasons.join("; ")));
    }

    let sizes: Vec<u64> = files.iter().map(|file| file.byte_size).collect();
    let estimated_chars = check_estimated_size(limits, &sizes).map_err(|err| match err {
        IngestValidationError::PayloadTooLarge(msg) => AppError::BudgetExceeded(msg),
        IngestValidationError::BadRequest(msg) => AppError::Validation(msg),
    })?;

    debug!(
        run_id = %ctx.run_id,
        file_count = files.len(),
        estimated_chars,
        max_total_chars = limits.max_total_chars,
        "course inputs validated"
    );

    machine
        .validate()
        .map_err(|(_, guard)| map_guard_error("validate", &guard))
}
