use crate::models::AudioFormat;
use std::path::Path;

/// Upload validation failure, tagged with a stable machine-readable code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

const MAX_FILENAME_BYTES: usize = 255;

/// Validates upload size: must be non-empty and within the configured limit
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ValidationError> {
    if size == 0 {
        return Err(ValidationError::new("EMPTY_FILE", "File appears to be empty"));
    }

    if size > max_size {
        return Err(ValidationError::new(
            "FILE_TOO_LARGE",
            format!(
                "File size {} bytes exceeds maximum allowed {} bytes ({} MB)",
                size,
                max_size,
                max_size / 1024 / 1024
            ),
        ));
    }
    Ok(())
}

/// Sanitizes filename to prevent path traversal and injection attacks
/// Returns the sanitized filename or an error if the name is invalid
pub fn sanitize_filename(filename: &str) -> Result<String, ValidationError> {
    // Browsers on Windows may send full paths
    let normalized = filename.replace('\\', "/");
    let name = Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .trim();

    if name.is_empty() {
        return Err(ValidationError::new(
            "INVALID_FILENAME",
            "Filename cannot be empty",
        ));
    }

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path components stripped from uploaded filename: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            c if c.is_control() => '_',
            ':' | '*' | '?' | '"' | '<' | '>' | '|' | ';' => '_',
            c => c,
        })
        .collect();

    if sanitized.len() <= MAX_FILENAME_BYTES {
        return Ok(sanitized);
    }

    // Shorten the stem only, the extension decides the audio format
    let (stem, extension) = match sanitized.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < MAX_FILENAME_BYTES / 2 => {
            (stem, format!(".{}", ext))
        }
        _ => (sanitized.as_str(), String::new()),
    };

    let mut end = MAX_FILENAME_BYTES - extension.len();
    while !stem.is_char_boundary(end) {
        end -= 1;
    }

    Ok(format!("{}{}", &stem[..end], extension))
}

/// Extracts the lowercased extension (text after the last `.`) and checks it
/// against the allow-list
pub fn validate_audio_extension(
    filename: &str,
    allowed: &[String],
) -> Result<AudioFormat, ValidationError> {
    let extension = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_lowercase(),
        _ => {
            return Err(ValidationError::new(
                "MISSING_EXTENSION",
                format!("File '{}' has no extension", filename),
            ));
        }
    };

    let format = AudioFormat::from_extension(&extension)
        .filter(|_| allowed.iter().any(|a| a == &extension));

    format.ok_or_else(|| {
        ValidationError::new(
            "UNSUPPORTED_EXTENSION",
            format!(
                "File extension '.{}' is not supported. Allowed: {}",
                extension,
                allowed.join(", ")
            ),
        )
    })
}

/// Rejects content whose leading bytes identify a known non-audio type.
/// Unrecognised content is accepted and left to the remote service.
pub fn verify_audio_content(header: &[u8]) -> Result<(), ValidationError> {
    match infer::get(header) {
        Some(kind) if kind.matcher_type() != infer::MatcherType::Audio => {
            Err(ValidationError::new(
                "CONTENT_MISMATCH",
                format!(
                    "File content looks like '{}', not audio",
                    kind.mime_type()
                ),
            ))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["wav".to_string(), "mp3".to_string()]
    }

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size(1024, 2048).is_ok());
        assert_eq!(validate_file_size(0, 2048).unwrap_err().code, "EMPTY_FILE");
        assert_eq!(
            validate_file_size(4096, 2048).unwrap_err().code,
            "FILE_TOO_LARGE"
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("talk.mp3").unwrap(), "talk.mp3");
        assert_eq!(sanitize_filename("../../etc/talk.wav").unwrap(), "talk.wav");
        assert_eq!(sanitize_filename("C:\\Users\\me\\a.wav").unwrap(), "a.wav");
        assert_eq!(sanitize_filename("a|b?.mp3").unwrap(), "a_b_.mp3");
        assert_eq!(sanitize_filename("").unwrap_err().code, "INVALID_FILENAME");
        assert_eq!(sanitize_filename("..").unwrap_err().code, "INVALID_FILENAME");
    }

    #[test]
    fn test_sanitize_long_filename_keeps_extension() {
        // 90 three-byte characters plus ".mp3" is 274 bytes
        let long = format!("{}.mp3", "会".repeat(90));
        let sanitized = sanitize_filename(&long).unwrap();
        assert!(sanitized.len() <= MAX_FILENAME_BYTES);
        assert!(sanitized.ends_with(".mp3"));
        assert!(sanitized.starts_with('会'));
        assert_eq!(
            validate_audio_extension(&sanitized, &allowed()).unwrap(),
            AudioFormat::Mp3
        );

        // No extension to keep: plain truncation on a char boundary
        let bare = "é".repeat(200);
        let sanitized = sanitize_filename(&bare).unwrap();
        assert_eq!(sanitized.len(), 254);
        assert!(sanitized.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_validate_audio_extension() {
        assert_eq!(
            validate_audio_extension("meeting.WAV", &allowed()).unwrap(),
            AudioFormat::Wav
        );
        assert_eq!(
            validate_audio_extension("song.final.mp3", &allowed()).unwrap(),
            AudioFormat::Mp3
        );
        assert_eq!(
            validate_audio_extension("notes.txt", &allowed()).unwrap_err().code,
            "UNSUPPORTED_EXTENSION"
        );
        assert_eq!(
            validate_audio_extension("clip.flac", &allowed()).unwrap_err().code,
            "UNSUPPORTED_EXTENSION"
        );
        assert_eq!(
            validate_audio_extension("noext", &allowed()).unwrap_err().code,
            "MISSING_EXTENSION"
        );
        assert_eq!(
            validate_audio_extension("trailing.", &allowed()).unwrap_err().code,
            "MISSING_EXTENSION"
        );
    }

    #[test]
    fn test_verify_audio_content() {
        // RIFF....WAVE
        let wav = b"RIFF\x24\x00\x00\x00WAVEfmt ";
        assert!(verify_audio_content(wav).is_ok());

        let id3 = b"ID3\x03\x00\x00\x00\x00\x00\x00";
        assert!(verify_audio_content(id3).is_ok());

        let pdf = b"%PDF-1.7\n";
        assert_eq!(
            verify_audio_content(pdf).unwrap_err().code,
            "CONTENT_MISMATCH"
        );

        // Unknown bytes are passed through
        assert!(verify_audio_content(b"hello world").is_ok());
    }
}
