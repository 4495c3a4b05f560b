use crate::config::AppConfig;
use crate::models::{TemporaryAudio, UploadedFile};
use crate::utils::validation::{
    ValidationError, sanitize_filename, validate_audio_extension, validate_file_size,
    verify_audio_content,
};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Error handling uploaded file: {0}")]
    Io(#[from] std::io::Error),
}

/// Persists uploads to scoped temp files
#[derive(Debug, Clone)]
pub struct IntakeService {
    temp_dir: Option<PathBuf>,
    max_file_size: usize,
    allowed_extensions: Vec<String>,
}

impl IntakeService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            temp_dir: config.temp_dir.clone(),
            max_file_size: config.max_file_size,
            allowed_extensions: config.allowed_extensions.clone(),
        }
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    /// Runs every check that must pass before anything is written.
    /// Returns the sanitized filename.
    pub fn validate(&self, upload: &UploadedFile) -> Result<String, ValidationError> {
        let filename = sanitize_filename(&upload.filename)?;
        validate_audio_extension(&filename, &self.allowed_extensions)?;
        validate_file_size(upload.size(), self.max_file_size)?;
        verify_audio_content(&upload.content[..upload.size().min(1024)])?;
        Ok(filename)
    }

    /// Writes the upload to a new uniquely named file carrying the declared
    /// extension. The input buffer is only read.
    pub fn save_uploaded_file(&self, upload: &UploadedFile) -> Result<TemporaryAudio, IntakeError> {
        let filename = self.validate(upload)?;
        let format = validate_audio_extension(&filename, &self.allowed_extensions)?;
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or_default();
        let suffix = format!(".{}", extension);

        let mut builder = tempfile::Builder::new();
        builder.prefix("audio-").suffix(&suffix);

        let mut file = match &self.temp_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempfile_in(std::path::absolute(dir)?)?
            }
            None => builder.tempfile()?,
        };

        if let Err(e) = file.write_all(&upload.content).and_then(|_| file.flush()) {
            error!("Failed to write upload '{}' to {:?}: {}", filename, file.path(), e);
            return Err(e.into());
        }

        debug!(
            filename = %filename,
            path = %file.path().display(),
            size = upload.size(),
            "Upload persisted to temp file"
        );

        Ok(TemporaryAudio::new(file, format, upload.size() as u64))
    }

    /// Async wrapper running the blocking write on the blocking pool
    pub async fn intake(&self, upload: UploadedFile) -> Result<TemporaryAudio, IntakeError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.save_uploaded_file(&upload))
            .await
            .map_err(|e| IntakeError::Io(std::io::Error::other(e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_in(dir: &std::path::Path) -> IntakeService {
        let mut config = AppConfig::development();
        config.temp_dir = Some(dir.to_path_buf());
        IntakeService::new(&config)
    }

    #[test]
    fn test_save_copies_bytes_and_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());
        let content: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let upload = UploadedFile::new("interview.mp3", content.clone());

        let handle = service.save_uploaded_file(&upload).unwrap();

        assert!(handle.path().is_absolute());
        assert!(handle.path().starts_with(std::path::absolute(dir.path()).unwrap()));
        assert!(handle.path().to_string_lossy().ends_with(".mp3"));
        assert_eq!(std::fs::read(handle.path()).unwrap(), content);
        assert_eq!(handle.size(), 4096);
        assert_eq!(handle.mime_type(), "audio/mpeg");
        // Input untouched
        assert_eq!(upload.content.as_ref(), content.as_slice());
    }

    #[test]
    fn test_long_filename_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());
        let filename = format!("{}.mp3", "会".repeat(90));
        let upload = UploadedFile::new(filename, b"ID3\x03\x00\x00\x00\x00\x00\x00".to_vec());

        let handle = service.save_uploaded_file(&upload).unwrap();
        assert!(handle.path().to_string_lossy().ends_with(".mp3"));
        assert_eq!(handle.mime_type(), "audio/mpeg");
    }

    #[test]
    fn test_declared_extension_case_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());
        let upload = UploadedFile::new("Memo.WAV", b"RIFF\x00\x00\x00\x00WAVE".to_vec());

        let handle = service.save_uploaded_file(&upload).unwrap();
        assert!(handle.path().to_string_lossy().ends_with(".WAV"));
    }

    #[test]
    fn test_each_intake_gets_a_unique_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());
        let upload = UploadedFile::new("a.wav", b"abc".to_vec());

        let first = service.save_uploaded_file(&upload).unwrap();
        let second = service.save_uploaded_file(&upload).unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn test_rejected_upload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        for upload in [
            UploadedFile::new("notes.txt", b"hello".to_vec()),
            UploadedFile::new("empty.wav", Vec::new()),
            UploadedFile::new("doc.mp3", b"%PDF-1.4\n".to_vec()),
        ] {
            let err = service.save_uploaded_file(&upload).unwrap_err();
            assert!(matches!(err, IntakeError::Validation(_)));
        }

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_oversized_upload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::development();
        config.temp_dir = Some(dir.path().to_path_buf());
        config.max_file_size = 8;
        let service = IntakeService::new(&config);

        let err = service
            .save_uploaded_file(&UploadedFile::new("big.wav", vec![0u8; 9]))
            .unwrap_err();
        match err {
            IntakeError::Validation(v) => assert_eq!(v.code, "FILE_TOO_LARGE"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let mut config = AppConfig::development();
        config.temp_dir = Some(blocker);
        let service = IntakeService::new(&config);

        let err = service
            .save_uploaded_file(&UploadedFile::new("a.wav", b"abc".to_vec()))
            .unwrap_err();
        assert!(matches!(err, IntakeError::Io(_)));
        assert!(err.to_string().starts_with("Error handling uploaded file"));
    }

    #[tokio::test]
    async fn test_async_intake_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        let handle = service
            .intake(UploadedFile::new("clip.wav", b"RIFF0000WAVE".to_vec()))
            .await
            .unwrap();
        let path = handle.path().to_path_buf();
        assert!(path.exists());

        drop(handle);
        assert!(!path.exists());
    }
}
