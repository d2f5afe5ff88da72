use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use common::error::AppError;
use course_pipeline::types::{CourseMetadata, CourseRequest, SourceFile};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCourseParams {
    #[serde(default)]
    pub files: Vec<UploadedFile>,
    #[serde(default)]
    pub course_metadata: Option<CourseMetadata>,
}

pub async fn generate_course(
    State(state): State<ApiState>,
    payload: Result<Json<GenerateCourseParams>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = payload.map_err(|rejection| ApiError::ValidationError(rejection.body_text()))?;

    info!(
        file_count = input.files.len(),
        has_metadata = input.course_metadata.is_some(),
        "Received course generation request"
    );

    let files = input
        .files
        .into_iter()
        .map(|file| {
            SourceFile::from_base64(file.name.as_str(), file.mime_type, &file.data).map_err(
                |err| match err {
                    AppError::Base64(_) => ApiError::ValidationError(format!(
                        "{}: file data must be valid base64",
                        file.name
                    )),
                    other => ApiError::from(other),
                },
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let request = CourseRequest {
        files,
        metadata: input.course_metadata,
    };

    // The run lives in its own task so a client disconnect lets the current
    // generation call finish; the drop guard then stops anything after it.
    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();
    let pipeline = state.pipeline.clone();
    let report = tokio::spawn(async move { pipeline.execute(request, cancel).await })
        .await
        .map_err(AppError::from)?;

    info!(
        run_id = %report.run_id,
        succeeded = report.result.is_ok(),
        chunk_count = report.stats.chunk_count,
        chunks_failed = report.stats.chunks_failed,
        failed_sources = report.source_failures.len(),
        generation_calls = report.stats.generation_calls,
        total_ms = report.stats.total_ms,
        "Course generation finished"
    );

    match report.result {
        Ok(output) => Ok((StatusCode::OK, Json(json!({ "content": output.content })))),
        Err(err) => {
            warn!(run_id = %report.run_id, code = err.code(), "Course generation request failed");
            Err(ApiError::from(err))
        }
    }
}
