use common::error::AppError;
use serde_json::Value;
use tracing::{info, instrument};

use super::{fatal_generation_error, generate_with_policy, map_guard_error};
use crate::{
    pipeline::{
        context::PipelineContext,
        state::{Condensed, CourseMachine, Synthesized},
    },
    types::{CourseMetadata, GenerationRequest},
    utils::llm_instructions::{difficulty_directive, structural_contract},
};

/// Assembles the single reduce prompt: output contract, caller metadata,
/// difficulty directive, then the content body.
pub fn build_synthesis_prompt(
    metadata: Option<&CourseMetadata>,
    body: &str,
    section_char_limit: usize,
) -> String {
    let mut blocks = vec![structural_contract(section_char_limit)];

    if let Some(block) = metadata.and_then(metadata_block) {
        blocks.push(block);
    }

    let level = metadata.map(CourseMetadata::difficulty).unwrap_or_default();
    blocks.push(format!("STYLE\n{}", difficulty_directive(level)));
    blocks.push(format!("SOURCE CONTENT\n{body}"));

    blocks.join("\n\n")
}

fn metadata_block(metadata: &CourseMetadata) -> Option<String> {
    let mut lines = Vec::new();

    if let Some(title) = &metadata.title {
        lines.push(format!("Title: {title}"));
    }
    if let Some(description) = &metadata.description {
        lines.push(format!("Description: {description}"));
    }
    if let Some(category) = &metadata.category {
        lines.push(format!("Category: {category}"));
    }
    if let Some(duration) = &metadata.duration {
        lines.push(format!("Duration: {duration}"));
    }
    if !metadata.objectives.is_empty() {
        lines.push("Learning objectives:".to_string());
        lines.extend(
            metadata
                .objectives
                .iter()
                .enumerate()
                .map(|(i, objective)| format!("{}. {objective}", i.saturating_add(1))),
        );
    }
    match &metadata.compliance_mapping {
        None | Some(Value::Null) => {}
        Some(Value::String(mapping)) => lines.push(format!("Compliance mapping: {mapping}")),
        Some(mapping) => lines.push(format!("Compliance mapping: {mapping}")),
    }

    if lines.is_empty() {
        return None;
    }

    Some(format!(
        "COURSE DETAILS (use these exactly as given)\n{}",
        lines.join("\n")
    ))
}

/// Reduce stage: one generation call, no fallback on failure.
#[instrument(level = "trace", skip_all, fields(run_id = %ctx.run_id))]
pub async fn synthesize(
    machine: CourseMachine<(), Condensed>,
    ctx: &mut PipelineContext<'_>,
    metadata: Option<&CourseMetadata>,
) -> Result<CourseMachine<(), Synthesized>, AppError> {
    ctx.ensure_active()?;

    let config = ctx.pipeline_config;
    let tuning = &config.tuning;
    let body = ctx.take_synthesis_body()?;
    let request = GenerationRequest::synthesize(build_synthesis_prompt(
        metadata,
        &body,
        tuning.section_char_limit,
    ));

    let outcome = generate_with_policy(ctx, &request, &tuning.reduce_retry, 1).await?;
    let content = match (outcome.text, outcome.last_failure) {
        (Some(content), _) => content,
        (None, Some((class, message))) if !class.is_retryable() => {
            return Err(fatal_generation_error(class, message));
        }
        (None, Some((class, message))) => {
            return Err(AppError::Synthesis(format!(
                "course generation failed ({}): {message}",
                class.as_str()
            )));
        }
        (None, None) => {
            return Err(AppError::Synthesis("course generation returned no content".into()));
        }
    };

    info!(
        run_id = %ctx.run_id,
        prompt_chars = request.prompt_text.chars().count(),
        content_chars = content.chars().count(),
        attempts = outcome.attempts,
        "course synthesized"
    );
    ctx.content = Some(content);

    machine
        .synthesize()
        .map_err(|(_, guard)| map_guard_error("synthesize", &guard))
}
