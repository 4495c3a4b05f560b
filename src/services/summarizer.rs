use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Opaque reference to a file held by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Failed to read audio file: {0}")]
    Io(#[from] std::io::Error),
}

impl SummarizeError {
    /// Whether trying again later could succeed. Nothing retries automatically.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SummarizeError::Network(_) => true,
            SummarizeError::Service { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SummarizeError::Authentication(_) => "authentication",
            SummarizeError::Network(_) => "network",
            SummarizeError::UnsupportedInput(_) => "unsupported_input",
            SummarizeError::Service { .. } => "service",
            SummarizeError::Io(_) => "io",
        }
    }
}

/// Hosted generative model able to take an uploaded file plus an instruction
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Transfer a local file, returning the remote reference
    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<RemoteFile, SummarizeError>;

    /// One completion request pairing `prompt` with `file`; returns the text field
    async fn generate_content(&self, prompt: &str, file: &RemoteFile)
    -> Result<String, SummarizeError>;

    /// Remove a previously uploaded file
    async fn delete_file(&self, file: &RemoteFile) -> Result<(), SummarizeError>;

    /// Model identifier, for reporting
    fn model(&self) -> &str;
}

/// Produces text summaries of local audio files through a [`GenerativeService`]
pub struct Summarizer {
    service: Arc<dyn GenerativeService>,
    prompt: String,
    delete_remote_files: bool,
}

impl Summarizer {
    pub fn new(service: Arc<dyn GenerativeService>, prompt: impl Into<String>) -> Self {
        Self {
            service,
            prompt: prompt.into(),
            delete_remote_files: false,
        }
    }

    pub fn with_remote_cleanup(mut self, enabled: bool) -> Self {
        self.delete_remote_files = enabled;
        self
    }

    pub fn model(&self) -> &str {
        self.service.model()
    }

    /// Upload the file, ask for a summary, return the response text unmodified
    pub async fn summarize(&self, path: &Path, mime_type: &str) -> Result<String, SummarizeError> {
        let remote = self.service.upload_file(path, mime_type).await?;
        info!(remote = %remote.name, model = %self.service.model(), "Requesting summary");

        let result = self.service.generate_content(&self.prompt, &remote).await;

        if self.delete_remote_files {
            if let Err(e) = self.service.delete_file(&remote).await {
                warn!("Failed to delete remote file {}: {}", remote.name, e);
            }
        }

        let summary = result?;
        info!(chars = summary.len(), "Summary received");
        Ok(summary)
    }
}

/// Stand-in service returning a fixed text, for development and tests
pub struct StubGenerativeService {
    pub response: String,
}

impl StubGenerativeService {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl GenerativeService for StubGenerativeService {
    async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<RemoteFile, SummarizeError> {
        // Fail like the real client would on an unreadable file
        tokio::fs::metadata(path).await?;
        Ok(RemoteFile {
            name: "files/stub".to_string(),
            uri: format!("stub://{}", path.display()),
            mime_type: mime_type.to_string(),
            state: Some("ACTIVE".to_string()),
        })
    }

    async fn generate_content(
        &self,
        _prompt: &str,
        _file: &RemoteFile,
    ) -> Result<String, SummarizeError> {
        Ok(self.response.clone())
    }

    async fn delete_file(&self, _file: &RemoteFile) -> Result<(), SummarizeError> {
        Ok(())
    }

    fn model(&self) -> &str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every call; fails generation when `fail_with` is set
    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<String>>,
        fail_with: Option<u16>,
    }

    #[async_trait]
    impl GenerativeService for RecordingService {
        async fn upload_file(
            &self,
            _path: &Path,
            mime_type: &str,
        ) -> Result<RemoteFile, SummarizeError> {
            self.calls.lock().unwrap().push(format!("upload:{mime_type}"));
            Ok(RemoteFile {
                name: "files/abc".to_string(),
                uri: "https://example.invalid/files/abc".to_string(),
                mime_type: mime_type.to_string(),
                state: None,
            })
        }

        async fn generate_content(
            &self,
            prompt: &str,
            file: &RemoteFile,
        ) -> Result<String, SummarizeError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("generate:{prompt}:{}", file.name));
            match self.fail_with {
                Some(status) => Err(SummarizeError::Service {
                    status,
                    message: "boom".to_string(),
                }),
                None => Ok("  Two people discuss the weather.\n".to_string()),
            }
        }

        async fn delete_file(&self, file: &RemoteFile) -> Result<(), SummarizeError> {
            self.calls.lock().unwrap().push(format!("delete:{}", file.name));
            Ok(())
        }

        fn model(&self) -> &str {
            "recording"
        }
    }

    #[tokio::test]
    async fn test_summary_returned_unmodified() {
        let service = Arc::new(RecordingService::default());
        let summarizer = Summarizer::new(service.clone(), "Please summarize the following audio.");

        let text = summarizer
            .summarize(Path::new("/tmp/x.wav"), "audio/wav")
            .await
            .unwrap();

        assert_eq!(text, "  Two people discuss the weather.\n");
        assert_eq!(
            *service.calls.lock().unwrap(),
            vec![
                "upload:audio/wav".to_string(),
                "generate:Please summarize the following audio.:files/abc".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let service = Arc::new(RecordingService {
            fail_with: Some(503),
            ..Default::default()
        });
        let summarizer = Summarizer::new(service, "p");

        let err = summarizer
            .summarize(Path::new("/tmp/x.mp3"), "audio/mpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::Service { status: 503, .. }));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_remote_cleanup_runs_even_on_failure() {
        let service = Arc::new(RecordingService {
            fail_with: Some(400),
            ..Default::default()
        });
        let summarizer = Summarizer::new(service.clone(), "p").with_remote_cleanup(true);

        assert!(summarizer.summarize(Path::new("/tmp/x.mp3"), "audio/mpeg").await.is_err());
        assert_eq!(
            service.calls.lock().unwrap().last().map(String::as_str),
            Some("delete:files/abc")
        );
    }

    #[tokio::test]
    async fn test_stub_service_requires_readable_file() {
        let summarizer = Summarizer::new(Arc::new(StubGenerativeService::new("fixed")), "p");
        let err = summarizer
            .summarize(Path::new("/definitely/not/here.wav"), "audio/wav")
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::Io(_)));

        let file = tempfile::NamedTempFile::new().unwrap();
        let text = summarizer.summarize(file.path(), "audio/wav").await.unwrap();
        assert_eq!(text, "fixed");
    }

    #[test]
    fn test_error_classification() {
        assert!(SummarizeError::Network("reset".into()).is_recoverable());
        assert!(!SummarizeError::Authentication("bad key".into()).is_recoverable());
        assert!(!SummarizeError::UnsupportedInput("x".into()).is_recoverable());
        assert!(
            SummarizeError::Service {
                status: 429,
                message: "quota".into()
            }
            .is_recoverable()
        );
        assert_eq!(SummarizeError::Network("x".into()).kind(), "network");
    }
}
