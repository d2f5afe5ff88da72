use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;
use common::error::AppError;
use tokio::{sync::Mutex, time::Instant};
use tokio_util::sync::CancellationToken;

use super::{
    config::{CourseConfig, CourseTuning, RetryPolicy},
    services::PipelineServices,
    CoursePipeline,
};
use crate::types::{
    ChunkStatus, CourseMetadata, CourseRequest, DifficultyLevel, ErrorClass, GenerationOutcome,
    GenerationRequest, GenerationStage, PipelineStatus, RunReport, SourceFile,
};

const COURSE_JSON: &str = r#"{"title":"Course","description":"d","sections":[]}"#;
const SUMMARY: &str = "Summary of the excerpt covering its key instructional points.";

/// Extracts text by decoding bytes as UTF-8 and answers generation calls from
/// a script. When the script runs dry it succeeds with a stage-appropriate reply.
struct ScriptedServices {
    script: Mutex<VecDeque<GenerationOutcome>>,
    calls: Mutex<Vec<GenerationRequest>>,
    extracted: Mutex<Vec<String>>,
    unreadable: Vec<String>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedServices {
    fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            extracted: Mutex::new(Vec::new()),
            unreadable: Vec::new(),
            cancel_after: None,
        }
    }

    fn with_script(script: Vec<GenerationOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::new()
        }
    }

    async fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().await.clone()
    }

    async fn stage_count(&self, stage: GenerationStage) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|request| request.stage == stage)
            .count()
    }
}

#[async_trait]
impl PipelineServices for ScriptedServices {
    async fn extract_text(&self, file: &SourceFile) -> Result<String, AppError> {
        self.extracted.lock().await.push(file.name.clone());
        if self.unreadable.contains(&file.name) {
            return Err(AppError::Extraction(format!("{} is unreadable", file.name)));
        }
        Ok(String::from_utf8_lossy(&file.data).into_owned())
    }

    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        let call_number = {
            let mut calls = self.calls.lock().await;
            calls.push(request.clone());
            calls.len()
        };

        if let Some((after, token)) = &self.cancel_after {
            if call_number >= *after {
                token.cancel();
            }
        }

        match self.script.lock().await.pop_front() {
            Some(outcome) => outcome,
            None => match request.stage {
                GenerationStage::Summarize => GenerationOutcome::Success(SUMMARY.into()),
                GenerationStage::Synthesize => GenerationOutcome::Success(COURSE_JSON.into()),
            },
        }
    }
}

fn test_config() -> CourseConfig {
    let instant_retry = RetryPolicy {
        transient_backoff_ms: 0,
        rate_limit_backoff_ms: 0,
        ..RetryPolicy::default()
    };

    CourseConfig {
        tuning: CourseTuning {
            inter_chunk_delay_ms: 0,
            map_retry: instant_retry,
            ..CourseTuning::default()
        },
        ..CourseConfig::default()
    }
}

fn paragraphs(count: usize, len: usize, tag: &str) -> String {
    (0..count)
        .map(|i| {
            let mut paragraph = format!("{tag} paragraph {i}. ");
            while paragraph.len() < len {
                paragraph.push_str("step ");
            }
            paragraph.truncate(len);
            paragraph
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn text_file(name: &str, text: &str) -> SourceFile {
    SourceFile::new(name, "text/plain", text.as_bytes().to_vec())
}

/// One file of roughly `chars` characters, in paragraphs of about a thousand.
fn corpus_of(chars: usize) -> Vec<SourceFile> {
    vec![text_file(
        "manual.txt",
        &paragraphs(chars / 1_000, 998, "Lesson"),
    )]
}

async fn run(
    services: Arc<ScriptedServices>,
    files: Vec<SourceFile>,
    metadata: Option<CourseMetadata>,
) -> RunReport {
    let pipeline = CoursePipeline::with_services(test_config(), services);
    pipeline
        .execute(CourseRequest { files, metadata }, CancellationToken::new())
        .await
}

#[tokio::test]
async fn many_sources_are_chunked_summarized_and_reduced_once() {
    let services = Arc::new(ScriptedServices::new());
    let files = vec![
        text_file("part-1.txt", &paragraphs(167, 998, "First")),
        text_file("part-2.txt", &paragraphs(167, 998, "Second")),
        text_file("part-3.txt", &paragraphs(166, 998, "Third")),
    ];

    let report = run(services.clone(), files, None).await;

    let output = report.result.expect("run completes");
    assert_eq!(output.content, COURSE_JSON);
    assert_eq!(report.stats.extracted_sources, 3);
    assert_eq!(report.stats.chunk_count, 13);
    assert_eq!(report.chunk_outcomes.len(), 13);
    assert!(report
        .chunk_outcomes
        .iter()
        .all(|outcome| outcome.status == ChunkStatus::Succeeded && outcome.attempts_used == 1));
    assert_eq!(services.stage_count(GenerationStage::Summarize).await, 13);
    assert_eq!(services.stage_count(GenerationStage::Synthesize).await, 1);

    let calls = services.calls().await;
    let last = calls.last().expect("reduce call");
    assert_eq!(last.stage, GenerationStage::Synthesize);
    assert!(calls
        .iter()
        .take(13)
        .all(|request| request.stage == GenerationStage::Summarize));
}

#[tokio::test]
async fn tiny_single_source_reports_no_readable_content() {
    let services = Arc::new(ScriptedServices::new());
    let files = vec![text_file("note.txt", "only thirty characters here..")];

    let report = run(services.clone(), files, None).await;

    assert_eq!(report.source_failures.len(), 1);
    let result = report.into_pipeline_result();
    assert_eq!(result.status, PipelineStatus::Failed);
    assert_eq!(result.error_code.as_deref(), Some("no_readable_content"));
    assert!(result
        .error_message
        .expect("message")
        .to_lowercase()
        .contains("no readable content"));
    assert!(services.calls().await.is_empty());
}

#[tokio::test]
async fn rate_limited_chunk_recovers_on_third_attempt() {
    let rate_limited = || GenerationOutcome::failure(ErrorClass::RateLimited, "429 slow down");
    let services = Arc::new(ScriptedServices::with_script(vec![
        GenerationOutcome::Success(SUMMARY.into()),
        rate_limited(),
        rate_limited(),
        GenerationOutcome::Success(SUMMARY.into()),
    ]));

    let report = run(services.clone(), corpus_of(110_000), None).await;

    assert!(report.result.is_ok());
    assert_eq!(report.stats.chunk_count, 3);
    assert_eq!(report.stats.chunks_succeeded, 3);
    assert_eq!(report.stats.retries, 2);
    let attempts: Vec<u32> = report
        .chunk_outcomes
        .iter()
        .map(|outcome| outcome.attempts_used)
        .collect();
    assert_eq!(attempts, vec![1, 3, 1]);
    assert_eq!(services.calls().await.len(), 6);
}

#[tokio::test]
async fn quota_exhaustion_halts_the_run_immediately() {
    let services = Arc::new(ScriptedServices::with_script(vec![
        GenerationOutcome::Success(SUMMARY.into()),
        GenerationOutcome::failure(ErrorClass::QuotaExceeded, "insufficient_quota"),
    ]));

    let report = run(services.clone(), corpus_of(110_000), None).await;

    assert!(matches!(report.result, Err(AppError::QuotaExceeded(_))));
    assert_eq!(report.chunk_outcomes.len(), 1);
    assert_eq!(services.calls().await.len(), 2);
    assert_eq!(services.stage_count(GenerationStage::Synthesize).await, 0);
    assert_eq!(
        report.into_pipeline_result().error_code.as_deref(),
        Some("quota_exceeded")
    );
}

#[tokio::test]
async fn over_budget_estimate_rejects_before_extraction() {
    let services = Arc::new(ScriptedServices::new());
    let files = vec![SourceFile::new(
        "huge.txt",
        "text/plain",
        vec![b'a'; 2_000_004],
    )];

    let report = run(services.clone(), files, None).await;

    assert!(matches!(report.result, Err(AppError::BudgetExceeded(_))));
    assert!(services.extracted.lock().await.is_empty());
    assert!(services.calls().await.is_empty());
}

#[tokio::test]
async fn invalid_files_are_all_reported_and_nothing_is_extracted() {
    let services = Arc::new(ScriptedServices::new());
    let files = vec![
        SourceFile::new("slides.pptx", "application/vnd.ms-powerpoint", vec![1, 2, 3]),
        SourceFile::new("empty.txt", "text/plain", Vec::new()),
        text_file("fine.txt", &paragraphs(2, 200, "Fine")),
    ];

    let report = run(services.clone(), files, None).await;

    match report.result {
        Err(AppError::Validation(message)) => {
            assert!(message.contains("slides.pptx"));
            assert!(message.contains("empty.txt"));
            assert!(!message.contains("fine.txt"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(services.extracted.lock().await.is_empty());
}

#[tokio::test]
async fn short_or_unreadable_sources_are_skipped_when_others_survive() {
    let services = Arc::new(ScriptedServices {
        unreadable: vec!["broken.pdf".to_string()],
        ..ScriptedServices::new()
    });
    let files = vec![
        text_file("short.txt", "tiny"),
        SourceFile::new("broken.pdf", "application/pdf", vec![0x25, 0x50, 0x44, 0x46]),
        text_file("guide.txt", &paragraphs(3, 300, "Guide")),
    ];

    let report = run(services.clone(), files, None).await;

    assert!(report.result.is_ok());
    assert_eq!(report.stats.extracted_sources, 1);
    let failed: Vec<&str> = report
        .source_failures
        .iter()
        .map(|failure| failure.source_name.as_str())
        .collect();
    assert_eq!(failed, vec!["short.txt", "broken.pdf"]);
    assert_eq!(services.extracted.lock().await.len(), 3);
}

#[tokio::test]
async fn corpus_under_minimum_total_fails() {
    let services = Arc::new(ScriptedServices::new());
    let files = vec![text_file(
        "brief.txt",
        "Sixty characters of text that clear the per source minimum.",
    )];

    let report = run(services.clone(), files, None).await;

    assert!(matches!(
        report.result,
        Err(AppError::InsufficientContent { .. })
    ));
    assert!(services.calls().await.is_empty());
}

#[tokio::test]
async fn corpus_at_threshold_goes_straight_to_synthesis() {
    let services = Arc::new(ScriptedServices::new());
    let files = vec![text_file("manual.txt", &"a".repeat(50_000))];

    let report = run(services.clone(), files, None).await;

    assert!(report.result.is_ok());
    assert_eq!(report.stats.corpus_chars, 50_000);
    assert_eq!(report.stats.chunk_count, 0);
    assert!(report.chunk_outcomes.is_empty());

    let calls = services.calls().await;
    assert_eq!(calls.len(), 1);
    let only = calls.first().expect("one call");
    assert_eq!(only.stage, GenerationStage::Synthesize);
    assert!(only.prompt_text.contains("=== Source: manual.txt ==="));
}

#[tokio::test]
async fn too_many_chunks_fails_without_generation_calls() {
    let services = Arc::new(ScriptedServices::new());
    let files = vec![
        text_file("a.txt", &paragraphs(300, 998, "A")),
        text_file("b.txt", &paragraphs(300, 998, "B")),
        text_file("c.txt", &paragraphs(300, 998, "C")),
    ];

    let report = run(services.clone(), files, None).await;

    assert!(matches!(report.result, Err(AppError::BudgetExceeded(_))));
    assert!(services.calls().await.is_empty());
}

#[tokio::test]
async fn exhausted_chunk_is_skipped_and_run_continues() {
    let unknown = || GenerationOutcome::failure(ErrorClass::Unknown, "upstream hiccup");
    let services = Arc::new(ScriptedServices::with_script(vec![
        GenerationOutcome::Success("first summary with enough characters".into()),
        unknown(),
        unknown(),
        unknown(),
        GenerationOutcome::Success("third summary with enough characters".into()),
    ]));

    let report = run(services.clone(), corpus_of(110_000), None).await;

    assert!(report.result.is_ok());
    let statuses: Vec<ChunkStatus> = report
        .chunk_outcomes
        .iter()
        .map(|outcome| outcome.status)
        .collect();
    assert_eq!(
        statuses,
        vec![ChunkStatus::Succeeded, ChunkStatus::Failed, ChunkStatus::Succeeded]
    );
    assert_eq!(
        report.chunk_outcomes.get(1).map(|o| o.attempts_used),
        Some(3)
    );

    let calls = services.calls().await;
    let reduce = calls.last().expect("reduce call");
    assert_eq!(reduce.stage, GenerationStage::Synthesize);
    let first = reduce.prompt_text.find("first summary").expect("first");
    let third = reduce.prompt_text.find("third summary").expect("third");
    assert!(first < third);
}

#[tokio::test]
async fn short_summary_counts_as_a_failed_attempt() {
    let services = Arc::new(ScriptedServices::with_script(vec![
        GenerationOutcome::Success("too short".into()),
    ]));

    let report = run(services.clone(), corpus_of(110_000), None).await;

    assert!(report.result.is_ok());
    assert_eq!(
        report.chunk_outcomes.first().map(|o| o.attempts_used),
        Some(2)
    );
}

#[tokio::test]
async fn every_chunk_failing_is_a_processing_error() {
    let script = (0..9)
        .map(|_| GenerationOutcome::failure(ErrorClass::RateLimited, "busy"))
        .collect();
    let services = Arc::new(ScriptedServices::with_script(script));

    let report = run(services.clone(), corpus_of(110_000), None).await;

    assert!(matches!(report.result, Err(AppError::Processing(_))));
    assert_eq!(report.stats.chunks_failed, 3);
    assert_eq!(services.stage_count(GenerationStage::Synthesize).await, 0);
}

#[tokio::test]
async fn generation_timeout_surfaces_as_timeout() {
    let services = Arc::new(ScriptedServices::with_script(vec![
        GenerationOutcome::failure(ErrorClass::Timeout, "timed out after 120s"),
    ]));

    let report = run(services.clone(), corpus_of(110_000), None).await;

    assert!(matches!(report.result, Err(AppError::GenerationTimeout(_))));
    assert_eq!(services.calls().await.len(), 1);
}

#[tokio::test]
async fn reduce_failure_has_no_fallback() {
    let services = Arc::new(ScriptedServices::with_script(vec![
        GenerationOutcome::failure(ErrorClass::RateLimited, "busy"),
    ]));

    let report = run(services.clone(), corpus_of(2_000), None).await;

    assert!(matches!(report.result, Err(AppError::Synthesis(_))));
    assert_eq!(services.calls().await.len(), 1);
    assert_eq!(
        report.into_pipeline_result().error_code.as_deref(),
        Some("synthesis_failed")
    );
}

#[tokio::test]
async fn cancellation_skips_remaining_chunks_and_reduce() {
    let cancel = CancellationToken::new();
    let services = Arc::new(ScriptedServices {
        cancel_after: Some((1, cancel.clone())),
        ..ScriptedServices::new()
    });
    let pipeline = CoursePipeline::with_services(test_config(), services.clone());

    let report = pipeline
        .execute(
            CourseRequest {
                files: corpus_of(110_000),
                metadata: None,
            },
            cancel,
        )
        .await;

    assert!(matches!(report.result, Err(AppError::Cancelled)));
    assert_eq!(report.chunk_outcomes.len(), 1);
    assert_eq!(services.calls().await.len(), 1);
}

/// Cancels `token` once paused time has advanced by `after`.
fn cancel_later(token: CancellationToken, after: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        token.cancel();
    });
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_inter_chunk_delay_ends_the_wait() {
    let mut config = test_config();
    config.tuning.inter_chunk_delay_ms = 60_000;
    let services = Arc::new(ScriptedServices::new());
    let pipeline = CoursePipeline::with_services(config, services.clone());
    let cancel = CancellationToken::new();
    cancel_later(cancel.clone(), Duration::from_secs(5));

    let started = Instant::now();
    let report = pipeline
        .execute(
            CourseRequest {
                files: corpus_of(110_000),
                metadata: None,
            },
            cancel,
        )
        .await;

    assert!(matches!(report.result, Err(AppError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(60));
    assert_eq!(report.chunk_outcomes.len(), 1);
    assert_eq!(services.stage_count(GenerationStage::Summarize).await, 1);
    assert_eq!(services.stage_count(GenerationStage::Synthesize).await, 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_retry_backoff_ends_the_wait() {
    let mut config = test_config();
    config.tuning.map_retry.rate_limit_backoff_ms = 30_000;
    let services = Arc::new(ScriptedServices::with_script(vec![GenerationOutcome::failure(
        ErrorClass::RateLimited,
        "slow down",
    )]));
    let pipeline = CoursePipeline::with_services(config, services.clone());
    let cancel = CancellationToken::new();
    cancel_later(cancel.clone(), Duration::from_secs(5));

    let started = Instant::now();
    let report = pipeline
        .execute(
            CourseRequest {
                files: corpus_of(110_000),
                metadata: None,
            },
            cancel,
        )
        .await;

    assert!(matches!(report.result, Err(AppError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(30));
    assert!(report.chunk_outcomes.is_empty());
    assert_eq!(report.stats.retries, 1);
    assert_eq!(services.calls().await.len(), 1);
    assert_eq!(services.stage_count(GenerationStage::Synthesize).await, 0);
}

#[tokio::test]
async fn difficulty_changes_only_the_style_block() {
    let mut call_counts = Vec::new();
    let mut prompts = Vec::new();

    for level in [
        DifficultyLevel::Beginner,
        DifficultyLevel::Moderate,
        DifficultyLevel::Advanced,
    ] {
        let services = Arc::new(ScriptedServices::with_script(vec![
            GenerationOutcome::Success(SUMMARY.into()),
            GenerationOutcome::failure(ErrorClass::RateLimited, "busy"),
        ]));
        let metadata = CourseMetadata {
            title: Some("Forklift Operation".into()),
            difficulty_level: Some(level),
            ..CourseMetadata::default()
        };

        let report = run(services.clone(), corpus_of(110_000), Some(metadata)).await;
        assert!(report.result.is_ok());

        let calls = services.calls().await;
        call_counts.push(calls.len());
        let reduce = calls.last().expect("reduce call");
        assert!(reduce.prompt_text.contains("Title: Forklift Operation"));
        prompts.push(reduce.prompt_text.clone());
    }

    assert!(call_counts.iter().all(|count| *count == 5));
    assert_ne!(prompts.first(), prompts.get(1));
    assert_ne!(prompts.get(1), prompts.get(2));
}

#[tokio::test]
async fn generate_course_returns_content_only_on_success() {
    let services = Arc::new(ScriptedServices::new());
    let pipeline = CoursePipeline::with_services(test_config(), services);

    let result = pipeline
        .generate_course(
            CourseRequest {
                files: corpus_of(5_000),
                metadata: None,
            },
            CancellationToken::new(),
        )
        .await;

    assert_eq!(result.status, PipelineStatus::Completed);
    assert_eq!(result.content.as_deref(), Some(COURSE_JSON));
    assert!(result.error_code.is_none());
}
