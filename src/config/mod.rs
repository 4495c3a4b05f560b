use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default Gemini model used for summarization
pub const DEFAULT_MODEL: &str = "models/gemini-1.5-pro-latest";

/// Default instruction sent alongside the uploaded audio
pub const DEFAULT_PROMPT: &str = "Please summarize the following audio.";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Application configuration, built once at start-up and shared read-only
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Google API key (GOOGLE_API_KEY). Absent key fails every summarization at call time.
    pub google_api_key: Option<String>,

    /// Summarization backend: "gemini" or "stub" (default: "gemini")
    pub summarizer_backend: String,

    /// Model resource name (default: "models/gemini-1.5-pro-latest")
    pub model: String,

    /// Service root, without trailing slash
    pub base_url: String,

    /// Instruction paired with the audio in the completion request
    pub prompt: String,

    /// Maximum accepted upload in bytes (default: 100 MB)
    pub max_file_size: usize,

    /// Lowercase extensions accepted by intake (default: wav, mp3)
    pub allowed_extensions: Vec<String>,

    /// Directory for intake temp files (default: OS temp dir)
    pub temp_dir: Option<PathBuf>,

    /// Timeout applied to every remote call (default: 300 s)
    pub request_timeout_secs: u64,

    /// How many times to poll an uploaded file until it becomes ACTIVE (default: 10)
    pub poll_attempts: u32,

    /// Delay between activation polls in milliseconds (default: 1000)
    pub poll_interval_ms: u64,

    /// Delete the remote copy once the summary is produced (default: false)
    pub delete_remote_files: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            summarizer_backend: "gemini".to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            max_file_size: 100 * 1024 * 1024, // 100 MB
            allowed_extensions: vec!["wav".to_string(), "mp3".to_string()],
            temp_dir: None,
            request_timeout_secs: 300,
            poll_attempts: 10,
            poll_interval_ms: 1000,
            delete_remote_files: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            google_api_key: env::var("GOOGLE_API_KEY")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),

            summarizer_backend: env::var("SUMMARIZER_BACKEND")
                .map(|v| v.to_lowercase())
                .unwrap_or(default.summarizer_backend),

            model: env::var("GEMINI_MODEL").unwrap_or(default.model),

            base_url: env::var("GEMINI_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default.base_url),

            prompt: env::var("SUMMARY_PROMPT").unwrap_or(default.prompt),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            allowed_extensions: env::var("ALLOWED_EXTENSIONS")
                .ok()
                .map(|v| parse_extensions(&v))
                .filter(|v| !v.is_empty())
                .unwrap_or(default.allowed_extensions),

            temp_dir: env::var("UPLOAD_TEMP_DIR").ok().map(PathBuf::from),

            request_timeout_secs: env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.request_timeout_secs),

            poll_attempts: env::var("GEMINI_POLL_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.poll_attempts),

            poll_interval_ms: env::var("GEMINI_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.poll_interval_ms),

            delete_remote_files: env::var("GEMINI_DELETE_REMOTE_FILES")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.delete_remote_files),
        }
    }

    /// Create config for development and tests (no key, local service, fast polling)
    pub fn development() -> Self {
        Self {
            google_api_key: None,
            base_url: "http://127.0.0.1:8089".to_string(),
            max_file_size: 10 * 1024 * 1024,
            request_timeout_secs: 10,
            poll_attempts: 3,
            poll_interval_ms: 10,
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn has_api_key(&self) -> bool {
        self.google_api_key.is_some()
    }

    /// Model name with the `models/` prefix the REST paths expect
    pub fn model_resource(&self) -> String {
        if self.model.starts_with("models/") || self.model.starts_with("tunedModels/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
