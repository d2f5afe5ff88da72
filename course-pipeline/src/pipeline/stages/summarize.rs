use std::time::Duration;

use common::error::AppError;
use tracing::{debug, info, instrument, warn};

use super::{generate_with_policy, map_guard_error, split_into_chunks};
use crate::{
    pipeline::{
        context::PipelineContext,
        state::{Assembled, Condensed, CourseMachine},
    },
    types::{Chunk, ChunkOutcome, GenerationRequest},
    utils::llm_instructions::SUMMARY_INSTRUCTIONS,
};

pub fn build_summary_prompt(chunk: &Chunk, chunk_count: usize) -> String {
    format!(
        "{SUMMARY_INSTRUCTIONS}\n\nExcerpt {} of {chunk_count}:\n\n{}",
        chunk.index.saturating_add(1),
        chunk.text
    )
}

/// Produces the body for the reduce stage. Small corpora pass through
/// untouched; larger ones are chunked and summarised one chunk at a time.
#[instrument(level = "trace", skip_all, fields(run_id = %ctx.run_id))]
pub async fn condense(
    machine: CourseMachine<(), Assembled>,
    ctx: &mut PipelineContext<'_>,
) -> Result<CourseMachine<(), Condensed>, AppError> {
    let config = ctx.pipeline_config;
    let tuning = &config.tuning;
    let corpus = ctx.corpus()?;
    let total_chars = corpus.total_char_length;

    if total_chars <= tuning.chunk_trigger_threshold {
        let body = corpus.combined_text();
        ctx.synthesis_body = Some(body);
        debug!(
            run_id = %ctx.run_id,
            total_chars,
            threshold = tuning.chunk_trigger_threshold,
            "corpus below chunking threshold; synthesizing directly"
        );
        return machine
            .condense()
            .map_err(|(_, guard)| map_guard_error("condense", &guard));
    }

    let chunks = split_into_chunks(
        &corpus.sources,
        total_chars,
        tuning.chunk_target_size,
        tuning.max_chunks,
    )?;
    ctx.chunks = chunks;

    info!(
        run_id = %ctx.run_id,
        total_chars,
        chunk_count = ctx.chunks.len(),
        "corpus chunked for summarization"
    );

    let summaries = summarize_chunks(ctx).await?;
    ctx.synthesis_body = Some(summaries);

    machine
        .condense()
        .map_err(|(_, guard)| map_guard_error("condense", &guard))
}

/// Map stage. Chunks run strictly in index order; a chunk that runs out of
/// attempts is recorded as failed and skipped.
async fn summarize_chunks(ctx: &mut PipelineContext<'_>) -> Result<String, AppError> {
    let config = ctx.pipeline_config;
    let tuning = &config.tuning;
    let chunk_count = ctx.chunks.len();
    let inter_chunk_delay = Duration::from_millis(tuning.inter_chunk_delay_ms);

    for position in 0..chunk_count {
        if position > 0 {
            ctx.pause(inter_chunk_delay).await?;
        }
        ctx.ensure_active()?;

        let Some(chunk) = ctx.chunks.get(position) else {
            break;
        };
        let chunk_index = chunk.index;
        let request = GenerationRequest::summarize(build_summary_prompt(chunk, chunk_count));
        let outcome = generate_with_policy(
            ctx,
            &request,
            &tuning.map_retry,
            tuning.min_summary_chars,
        )
        .await?;

        let chunk_outcome = match outcome.text {
            Some(summary) => {
                debug!(
                    run_id = %ctx.run_id,
                    chunk_index,
                    attempts = outcome.attempts,
                    summary_chars = summary.chars().count(),
                    "chunk summarized"
                );
                ChunkOutcome::succeeded(chunk_index, summary, outcome.attempts)
            }
            None => {
                warn!(
                    run_id = %ctx.run_id,
                    chunk_index,
                    attempts = outcome.attempts,
                    last_error = ?outcome.last_failure,
                    "chunk failed after exhausting retries"
                );
                ChunkOutcome::failed(chunk_index, outcome.attempts)
            }
        };
        ctx.chunk_outcomes.push(chunk_outcome);
    }

    let summaries: Vec<&str> = ctx
        .chunk_outcomes
        .iter()
        .filter_map(|outcome| outcome.summary_text.as_deref())
        .collect();

    if summaries.is_empty() {
        return Err(AppError::Processing(
            "Failed to process document content".to_string(),
        ));
    }

    let failed = chunk_count.saturating_sub(summaries.len());
    if failed > 0 {
        warn!(
            run_id = %ctx.run_id,
            succeeded = summaries.len(),
            failed,
            "continuing with partial chunk summaries"
        );
    }

    Ok(summaries.join("\n\n"))
}
