use common::error::AppError;
use tracing::{debug, info, instrument, warn};

use super::map_guard_error;
use crate::{
    pipeline::{
        context::PipelineContext,
        state::{Assembled, CourseMachine, Validated},
    },
    types::{Corpus, ExtractedText, SourceFailure, SourceFile},
};

/// Extracts every file exactly once and merges the usable texts. Individual
/// extraction failures are soft; only an empty or too-short corpus is fatal.
#[instrument(level = "trace", skip_all, fields(run_id = %ctx.run_id))]
pub async fn assemble_corpus(
    machine: CourseMachine<(), Validated>,
    ctx: &mut PipelineContext<'_>,
    files: Vec<SourceFile>,
) -> Result<CourseMachine<(), Assembled>, AppError> {
    let config = ctx.pipeline_config;
    let tuning = &config.tuning;
    let mut texts = Vec::with_capacity(files.len());
    let mut failures = Vec::new();

    // Consumed one at a time so raw bytes are released as soon as they are read.
    for file in files {
        match ctx.services.extract_text(&file).await {
            Ok(raw) => {
                let extracted = ExtractedText::new(file.name.as_str(), raw.trim().to_string());
                if extracted.char_length < tuning.min_source_chars {
                    warn!(
                        run_id = %ctx.run_id,
                        source = %file.name,
                        chars = extracted.char_length,
                        min_source_chars = tuning.min_source_chars,
                        "extracted text too short; source skipped"
                    );
                    failures.push(SourceFailure {
                        source_name: file.name,
                        reason: format!(
                            "extracted only {} characters (minimum {})",
                            extracted.char_length, tuning.min_source_chars
                        ),
                    });
                    continue;
                }

                debug!(
                    run_id = %ctx.run_id,
                    source = %file.name,
                    chars = extracted.char_length,
                    "source extracted"
                );
                texts.push(extracted);
            }
            Err(err) => {
                warn!(
                    run_id = %ctx.run_id,
                    source = %file.name,
                    error = %err,
                    "text extraction failed; source skipped"
                );
                failures.push(SourceFailure {
                    source_name: file.name,
                    reason: err.to_string(),
                });
            }
        }
    }

    let corpus = Corpus::assemble(texts, failures);
    let total_chars = corpus.total_char_length;
    let is_empty = corpus.is_empty();
    let failed_sources = corpus.per_source_failures.len();
    let corpus_sources = corpus.source_count;
    ctx.corpus = Some(corpus);

    if is_empty {
        return Err(AppError::NoReadableContent);
    }

    if total_chars < tuning.min_total_chars {
        return Err(AppError::InsufficientContent {
            chars: total_chars,
            min: tuning.min_total_chars,
        });
    }

    if total_chars > tuning.max_total_chars {
        return Err(AppError::BudgetExceeded(format!(
            "Extracted content has {total_chars} characters which exceeds the limit of {} characters",
            tuning.max_total_chars
        )));
    }

    info!(
        run_id = %ctx.run_id,
        sources = corpus_sources,
        failed_sources,
        total_chars,
        "course corpus assembled"
    );

    machine
        .assemble()
        .map_err(|(_, guard)| map_guard_error("assemble", &guard))
}
