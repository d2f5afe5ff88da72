use std::time::Duration;

use common::error::AppError;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::types::{
    Chunk, ChunkOutcome, Corpus, GenerationOutcome, GenerationRequest, RunStats, SourceFailure,
};

use super::{config::CourseConfig, services::PipelineServices};

/// Run-scoped state. Created per request and dropped when the run ends.
pub struct PipelineContext<'a> {
    pub run_id: String,
    pub pipeline_config: &'a CourseConfig,
    pub services: &'a dyn PipelineServices,
    pub cancel: CancellationToken,
    pub source_count: usize,
    pub corpus: Option<Corpus>,
    pub chunks: Vec<Chunk>,
    pub chunk_outcomes: Vec<ChunkOutcome>,
    /// Text handed to the reduce stage: joined summaries or the raw corpus.
    pub synthesis_body: Option<String>,
    pub content: Option<String>,
    pub generation_calls: u32,
    pub retries: u32,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        run_id: String,
        pipeline_config: &'a CourseConfig,
        services: &'a dyn PipelineServices,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            run_id,
            pipeline_config,
            services,
            cancel,
            source_count: 0,
            corpus: None,
            chunks: Vec::new(),
            chunk_outcomes: Vec::new(),
            synthesis_body: None,
            content: None,
            generation_calls: 0,
            retries: 0,
        }
    }

    pub fn corpus(&self) -> Result<&Corpus, AppError> {
        self.corpus
            .as_ref()
            .ok_or_else(|| AppError::InternalError("corpus expected to be assembled".into()))
    }

    pub fn take_synthesis_body(&mut self) -> Result<String, AppError> {
        self.synthesis_body.take().ok_or_else(|| {
            AppError::InternalError("synthesis body expected to be available".into())
        })
    }

    pub fn take_content(&mut self) -> Result<String, AppError> {
        self.content
            .take()
            .ok_or_else(|| AppError::InternalError("course content expected to be available".into()))
    }

    pub fn ensure_active(&self) -> Result<(), AppError> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        Ok(())
    }

    /// Non-blocking wait that ends early, with an error, if the run is cancelled.
    pub async fn pause(&self, duration: Duration) -> Result<(), AppError> {
        if duration.is_zero() {
            return self.ensure_active();
        }

        tokio::select! {
            () = self.cancel.cancelled() => Err(AppError::Cancelled),
            () = sleep(duration) => Ok(()),
        }
    }

    /// Issues one generation call. An in-flight call is never raced against cancellation.
    pub async fn generate(&mut self, request: &GenerationRequest) -> GenerationOutcome {
        self.generation_calls = self.generation_calls.saturating_add(1);
        self.services.generate(request).await
    }

    pub fn source_failures(&self) -> Vec<SourceFailure> {
        self.corpus
            .as_ref()
            .map(|corpus| corpus.per_source_failures.clone())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> RunStats {
        let chunks_succeeded = self
            .chunk_outcomes
            .iter()
            .filter(|outcome| outcome.is_success())
            .count();

        RunStats {
            source_count: self.source_count,
            extracted_sources: self.corpus.as_ref().map_or(0, |c| c.source_count),
            corpus_chars: self.corpus.as_ref().map_or(0, |c| c.total_char_length),
            chunk_count: self.chunks.len(),
            chunks_succeeded,
            chunks_failed: self.chunk_outcomes.len().saturating_sub(chunks_succeeded),
            generation_calls: self.generation_calls,
            retries: self.retries,
            total_ms: 0,
        }
    }

    pub fn abort(&mut self, err: AppError) -> AppError {
        if err.is_client_error() || matches!(err, AppError::Cancelled) {
            warn!(
                run_id = %self.run_id,
                code = err.code(),
                error = %err,
                "course pipeline rejected request"
            );
        } else {
            error!(
                run_id = %self.run_id,
                code = err.code(),
                generation_calls = self.generation_calls,
                error = %err,
                "course pipeline aborted"
            );
        }
        err
    }
}
