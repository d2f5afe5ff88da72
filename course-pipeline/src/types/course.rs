use common::error::AppError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{ChunkOutcome, SourceFailure, SourceFile};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DifficultyLevel {
    #[serde(alias = "beginner", alias = "BEGINNER")]
    Beginner,
    #[default]
    #[serde(alias = "moderate", alias = "MODERATE", alias = "intermediate", alias = "Intermediate")]
    Moderate,
    #[serde(alias = "advanced", alias = "ADVANCED")]
    Advanced,
}

/// Caller-supplied course details. Read-only for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "difficulty")]
    pub difficulty_level: Option<DifficultyLevel>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub duration: Option<String>,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub compliance_mapping: Option<Value>,
}

impl CourseMetadata {
    pub fn difficulty(&self) -> DifficultyLevel {
        self.difficulty_level.unwrap_or_default()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Default)]
pub struct CourseRequest {
    pub files: Vec<SourceFile>,
    pub metadata: Option<CourseMetadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStatus {
    Completed,
    Failed,
}

/// Terminal output of one run: either complete content or one error, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub status: PipelineStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PipelineResult {
    pub fn completed(content: String) -> Self {
        Self {
            status: PipelineStatus::Completed,
            content: Some(content),
            error_code: None,
            error_message: None,
        }
    }

    pub fn failed(err: &AppError) -> Self {
        Self {
            status: PipelineStatus::Failed,
            content: None,
            error_code: Some(err.code().to_string()),
            error_message: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub source_count: usize,
    pub extracted_sources: usize,
    pub corpus_chars: usize,
    pub chunk_count: usize,
    pub chunks_succeeded: usize,
    pub chunks_failed: usize,
    pub generation_calls: u32,
    pub retries: u32,
    pub total_ms: u64,
}

#[derive(Debug)]
pub struct CourseOutput {
    pub content: String,
}

/// Everything a run produced, including the per-chunk and per-source records
/// that are kept for telemetry even when the run fails.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub result: Result<CourseOutput, AppError>,
    pub chunk_outcomes: Vec<ChunkOutcome>,
    pub source_failures: Vec<SourceFailure>,
    pub stats: RunStats,
}

impl RunReport {
    pub fn into_pipeline_result(self) -> PipelineResult {
        match self.result {
            Ok(output) => PipelineResult::completed(output.content),
            Err(err) => PipelineResult::failed(&err),
        }
    }
}
