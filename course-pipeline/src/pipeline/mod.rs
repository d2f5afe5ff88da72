mod config;
mod context;
mod services;
mod stages;
mod state;

pub use config::{CourseConfig, CourseTuning, RetryPolicy};
pub use services::{build_openai_client, DefaultPipelineServices, PipelineServices};
pub use stages::{build_summary_prompt, build_synthesis_prompt, expected_chunk_count};

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_openai::{config::OpenAIConfig, Client};
use common::{error::AppError, utils::config::AppConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::types::{CourseOutput, CourseRequest, PipelineResult, RunReport};

use self::{
    context::PipelineContext,
    stages::{assemble_corpus, condense, synthesize, validate_inputs},
    state::ready,
};

/// Orchestrates one document-to-course run per call. Holds only immutable
/// configuration and collaborator handles, so it can be shared across requests.
#[allow(clippy::module_name_repetitions)]
pub struct CoursePipeline {
    pipeline_config: CourseConfig,
    services: Arc<dyn PipelineServices>,
}

impl CoursePipeline {
    pub fn new(openai_client: Arc<Client<OpenAIConfig>>, config: &AppConfig) -> Self {
        let services = DefaultPipelineServices::new(openai_client, config);
        Self::with_services(CourseConfig::from(config), Arc::new(services))
    }

    pub fn with_services(pipeline_config: CourseConfig, services: Arc<dyn PipelineServices>) -> Self {
        Self {
            pipeline_config,
            services,
        }
    }

    pub fn config(&self) -> &CourseConfig {
        &self.pipeline_config
    }

    /// Runs the pipeline and collapses the report into the caller-facing result.
    pub async fn generate_course(
        &self,
        request: CourseRequest,
        cancel: CancellationToken,
    ) -> PipelineResult {
        self.execute(request, cancel).await.into_pipeline_result()
    }

    #[tracing::instrument(skip_all, fields(file_count = request.files.len()))]
    pub async fn execute(&self, request: CourseRequest, cancel: CancellationToken) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let mut ctx = PipelineContext::new(
            run_id.clone(),
            &self.pipeline_config,
            self.services.as_ref(),
            cancel,
        );

        let started = Instant::now();
        let result = self.drive_pipeline(&mut ctx, request).await;

        let mut stats = ctx.stats();
        stats.total_ms = Self::duration_millis(started.elapsed());

        RunReport {
            run_id,
            result,
            chunk_outcomes: std::mem::take(&mut ctx.chunk_outcomes),
            source_failures: ctx.source_failures(),
            stats,
        }
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    async fn drive_pipeline(
        &self,
        ctx: &mut PipelineContext<'_>,
        request: CourseRequest,
    ) -> Result<CourseOutput, AppError> {
        let CourseRequest { files, metadata } = request;
        let machine = ready();

        let stage_start = Instant::now();
        let machine = validate_inputs(machine, ctx, &files).map_err(|err| ctx.abort(err))?;
        let validate_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = assemble_corpus(machine, ctx, files)
            .await
            .map_err(|err| ctx.abort(err))?;
        let assemble_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = condense(machine, ctx).await.map_err(|err| ctx.abort(err))?;
        let condense_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let _machine = synthesize(machine, ctx, metadata.as_ref())
            .await
            .map_err(|err| ctx.abort(err))?;
        let synthesize_duration = stage_start.elapsed();

        let stats = ctx.stats();
        info!(
            run_id = %ctx.run_id,
            sources = stats.extracted_sources,
            corpus_chars = stats.corpus_chars,
            chunk_count = stats.chunk_count,
            chunks_failed = stats.chunks_failed,
            generation_calls = stats.generation_calls,
            retries = stats.retries,
            validate_ms = Self::duration_millis(validate_duration),
            assemble_ms = Self::duration_millis(assemble_duration),
            condense_ms = Self::duration_millis(condense_duration),
            synthesize_ms = Self::duration_millis(synthesize_duration),
            "course pipeline finished"
        );

        Ok(CourseOutput {
            content: ctx.take_content()?,
        })
    }
}

#[cfg(test)]
mod tests;
