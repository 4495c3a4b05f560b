use crate::AppState;
use crate::api::error::AppError;
use crate::models::UploadedFile;
use crate::services::audio_info::{AudioInfo, probe_audio};
use crate::utils::validation::{ValidationError, sanitize_filename, validate_audio_extension};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct SummaryResponse {
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
    pub audio: Option<AudioInfo>,
    pub model: String,
    pub summary: String,
}

/// A body cut off by the request limit is an oversize file, not a malformed form
fn multipart_error(error: MultipartError, max_file_size: usize) -> AppError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::Validation(ValidationError::new(
            "FILE_TOO_LARGE",
            format!(
                "Upload exceeds maximum allowed {} bytes ({} MB)",
                max_file_size,
                max_file_size / 1024 / 1024
            ),
        ));
    }
    AppError::BadRequest(format!("Failed to read upload: {}", error))
}

#[utoipa::path(
    post,
    path = "/api/summarize",
    request_body(content = Multipart, description = "Audio upload in field `file` (wav or mp3)"),
    responses(
        (status = 200, description = "Summary produced", body = SummaryResponse),
        (status = 400, description = "Malformed request"),
        (status = 413, description = "File too large"),
        (status = 415, description = "Unsupported file type"),
        (status = 422, description = "Audio rejected by the summarization service"),
        (status = 502, description = "Summarization service unreachable or failed"),
        (status = 503, description = "Summarization service credential missing or invalid")
    ),
    tag = "summaries"
)]
pub async fn summarize_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SummaryResponse>, AppError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, state.config.max_file_size))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("unnamed").to_string();

        // Reject by name before buffering the body
        let sanitized = sanitize_filename(&filename)?;
        validate_audio_extension(&sanitized, state.intake.allowed_extensions())?;

        let content = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, state.config.max_file_size))?;

        upload = Some((sanitized, UploadedFile::new(filename, content)));
    }

    let (filename, upload) =
        upload.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    // 1. Intake. The handle deletes the temp file when it goes out of scope.
    let audio = state.intake.intake(upload).await?;
    info!(
        filename = %filename,
        size = audio.size(),
        path = %audio.path().display(),
        "📥 Audio received"
    );

    let probe_path = audio.path().to_path_buf();
    let audio_info = tokio::task::spawn_blocking(move || probe_audio(&probe_path))
        .await
        .ok()
        .flatten();

    // 2. Summarization
    let summary = state
        .summarizer
        .summarize(audio.path(), audio.mime_type())
        .await?;

    info!(filename = %filename, chars = summary.len(), "📝 Summary ready");

    Ok(Json(SummaryResponse {
        filename,
        size: audio.size(),
        mime_type: audio.mime_type().to_string(),
        audio: audio_info,
        model: state.summarizer.model().to_string(),
        summary,
    }))
}
