use crate::config::AppConfig;
use crate::services::gemini::GeminiClient;
use crate::services::summarizer::{GenerativeService, StubGenerativeService, Summarizer};
use crate::utils::validation::validate_audio_extension;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub const STUB_SUMMARY: &str = "This is a placeholder summary produced by the stub backend.";

/// Factory for the generative backend named in the config
pub fn create_generative_service(config: &AppConfig) -> anyhow::Result<Arc<dyn GenerativeService>> {
    match config.summarizer_backend.as_str() {
        "gemini" => Ok(Arc::new(GeminiClient::new(config)?)),
        "stub" => {
            warn!("Stub summarizer active: audio will not be sent anywhere");
            Ok(Arc::new(StubGenerativeService::new(STUB_SUMMARY)))
        }
        other => {
            warn!("Unknown summarizer backend '{}', using gemini", other);
            Ok(Arc::new(GeminiClient::new(config)?))
        }
    }
}

/// Builds the single summarizer shared by every request
pub fn setup_summarizer(config: &AppConfig) -> anyhow::Result<Arc<Summarizer>> {
    let service = create_generative_service(config)?;

    if config.summarizer_backend != "stub" && !config.has_api_key() {
        warn!("GOOGLE_API_KEY is not set; every summarization request will fail");
    }

    info!(
        "🤖 Summarizer ready: backend={}, model={}",
        config.summarizer_backend,
        service.model()
    );

    Ok(Arc::new(
        Summarizer::new(service, config.prompt.clone())
            .with_remote_cleanup(config.delete_remote_files),
    ))
}

/// One-shot mode: the file is already local, so no intake copy is made
pub async fn summarize_local_file(
    config: &AppConfig,
    summarizer: &Summarizer,
    path: &Path,
) -> anyhow::Result<String> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file path {:?}", path))?;
    let format = validate_audio_extension(filename, &config.allowed_extensions)?;

    info!("🎧 Summarizing {}", path.display());
    Ok(summarizer.summarize(path, format.mime_type()).await?)
}
