use crate::services::intake::IntakeError;
use crate::services::summarizer::SummarizeError;
use crate::utils::validation::ValidationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error("Summarization failed: {0}")]
    Summarize(#[from] SummarizeError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(v) | AppError::Intake(IntakeError::Validation(v)) => {
                validation_status(v)
            }
            AppError::Intake(IntakeError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Summarize(e) => match e {
                SummarizeError::Authentication(_) => StatusCode::SERVICE_UNAVAILABLE,
                SummarizeError::Network(_) => StatusCode::BAD_GATEWAY,
                SummarizeError::UnsupportedInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SummarizeError::Service { .. } => StatusCode::BAD_GATEWAY,
                SummarizeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Validation(v) | AppError::Intake(IntakeError::Validation(v)) => v.code,
            AppError::Intake(IntakeError::Io(_)) => "intake_io",
            AppError::Summarize(e) => e.kind(),
        }
    }
}

fn validation_status(error: &ValidationError) -> StatusCode {
    match error.code {
        "UNSUPPORTED_EXTENSION" | "MISSING_EXTENSION" | "CONTENT_MISMATCH" => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        "FILE_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        let message = match &self {
            AppError::Intake(IntakeError::Io(e)) => {
                tracing::error!("Intake I/O error: {:?}", e);
                self.to_string()
            }
            AppError::Summarize(e) => {
                tracing::error!(kind, recoverable = e.is_recoverable(), "Summarization error: {}", e);
                self.to_string()
            }
            AppError::Validation(v) | AppError::Intake(IntakeError::Validation(v)) => {
                v.message.clone()
            }
            AppError::BadRequest(msg) => msg.clone(),
        };

        let body = Json(json!({
            "error": message,
            "kind": kind
        }));

        (status, body).into_response()
    }
}
