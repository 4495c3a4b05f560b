use crate::config::AppConfig;
use crate::services::summarizer::{GenerativeService, RemoteFile, SummarizeError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Google Gemini REST client (v1beta Files API + generateContent)
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    poll_attempts: u32,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_key: config.google_api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model_resource(),
            poll_attempts: config.poll_attempts,
            poll_interval: config.poll_interval(),
        })
    }

    fn api_key(&self) -> Result<&str, SummarizeError> {
        self.api_key.as_deref().ok_or_else(|| {
            SummarizeError::Authentication("GOOGLE_API_KEY is not configured".to_string())
        })
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, SummarizeError> {
        let url = format!("{}/v1beta/{}", self.base_url, name);
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, self.api_key()?)
            .send()
            .await
            .map_err(transport_error)?;

        parse_json(response).await
    }

    /// Freshly uploaded files may still be PROCESSING; wait for ACTIVE
    async fn wait_until_active(&self, mut file: RemoteFile) -> Result<RemoteFile, SummarizeError> {
        for attempt in 0..=self.poll_attempts {
            let state = file.state.clone();
            match state.as_deref() {
                None | Some("ACTIVE") | Some("STATE_UNSPECIFIED") => return Ok(file),
                Some("FAILED") => {
                    return Err(SummarizeError::UnsupportedInput(format!(
                        "Service could not process {}",
                        file.name
                    )));
                }
                Some(state) => {
                    if attempt == self.poll_attempts {
                        break;
                    }
                    debug!(file = %file.name, state, attempt, "Waiting for uploaded file");
                    tokio::time::sleep(self.poll_interval).await;
                    file = self.get_file(&file.name).await?;
                }
            }
        }

        Err(SummarizeError::Service {
            status: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            message: format!("File {} is still being processed", file.name),
        })
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<RemoteFile, SummarizeError> {
        let api_key = self.api_key()?;
        let data = tokio::fs::read(path).await?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());

        debug!(file = %display_name, size = data.len(), mime_type, "Starting resumable upload");

        // 1. Start the resumable session
        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header(API_KEY_HEADER, api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", data.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(transport_error)?;

        if !start.status().is_success() {
            return Err(error_from_response(start).await);
        }

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
            .ok_or_else(|| SummarizeError::Service {
                status: start.status().as_u16(),
                message: "Upload session did not return an upload URL".to_string(),
            })?;

        // 2. Send the bytes and finalize
        let response = self
            .client
            .post(&upload_url)
            .header(API_KEY_HEADER, api_key)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(data)
            .send()
            .await
            .map_err(transport_error)?;

        let mut uploaded: UploadResponse = parse_json(response).await?;
        if uploaded.file.mime_type.is_empty() {
            uploaded.file.mime_type = mime_type.to_string();
        }
        info!(remote = %uploaded.file.name, "Audio uploaded");

        self.wait_until_active(uploaded.file).await
    }

    async fn generate_content(
        &self,
        prompt: &str,
        file: &RemoteFile,
    ) -> Result<String, SummarizeError> {
        let api_key = self.api_key()?;
        let url = format!("{}/v1beta/{}:generateContent", self.base_url, self.model);

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    { "fileData": { "mimeType": file.mime_type, "fileUri": file.uri } }
                ]
            }]
        });

        debug!(model = %self.model, file = %file.name, "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let parsed: GenerateContentResponse = parse_json(response).await?;
        extract_text(parsed)
    }

    async fn delete_file(&self, file: &RemoteFile) -> Result<(), SummarizeError> {
        let url = format!("{}/v1beta/{}", self.base_url, file.name);
        let response = self
            .client
            .delete(&url)
            .header(API_KEY_HEADER, self.api_key()?)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Concatenates the text parts of the first candidate
fn extract_text(response: GenerateContentResponse) -> Result<String, SummarizeError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => SummarizeError::UnsupportedInput(format!("Prompt blocked: {}", reason)),
            None => SummarizeError::Service {
                status: StatusCode::OK.as_u16(),
                message: "Response contained no candidates".to_string(),
            },
        });
    };

    let texts: Vec<String> = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if texts.is_empty() {
        return Err(match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                SummarizeError::UnsupportedInput(format!("Response blocked: {}", reason))
            }
            reason => SummarizeError::Service {
                status: StatusCode::OK.as_u16(),
                message: format!(
                    "Response contained no text (finish reason: {})",
                    reason.unwrap_or("unknown")
                ),
            },
        });
    }

    Ok(texts.concat())
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SummarizeError> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_from_response(response).await);
    }

    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body).map_err(|e| SummarizeError::Service {
        status: status.as_u16(),
        message: format!("Malformed response: {}", e),
    })
}

async fn error_from_response(response: reqwest::Response) -> SummarizeError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    classify_error(status, &body)
}

/// Maps a non-success status and its body onto an error kind
fn classify_error(status: StatusCode, body: &str) -> SummarizeError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
    let api_status = parsed
        .as_ref()
        .and_then(|b| b.error.status.clone())
        .unwrap_or_default();
    let message = parsed
        .map(|b| b.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body.to_string()
            }
        });

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || api_status == "UNAUTHENTICATED"
        || api_status == "PERMISSION_DENIED"
        || body.contains("API_KEY_INVALID")
    {
        return SummarizeError::Authentication(message);
    }

    if status == StatusCode::BAD_REQUEST
        || status == StatusCode::UNSUPPORTED_MEDIA_TYPE
        || status == StatusCode::UNPROCESSABLE_ENTITY
    {
        return SummarizeError::UnsupportedInput(message);
    }

    SummarizeError::Service {
        status: status.as_u16(),
        message,
    }
}

fn transport_error(e: reqwest::Error) -> SummarizeError {
    if e.is_timeout() {
        SummarizeError::Network(format!("Request timed out: {}", e))
    } else if let Some(status) = e.status() {
        SummarizeError::Service {
            status: status.as_u16(),
            message: e.to_string(),
        }
    } else {
        SummarizeError::Network(e.to_string())
    }
}
