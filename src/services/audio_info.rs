use lofty::file::AudioFile;
use lofty::probe::Probe;
use serde::Serialize;
use std::path::Path;
use utoipa::ToSchema;

/// Technical properties of an uploaded recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AudioInfo {
    pub duration_ms: u64,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
}

/// Reads audio properties from a file on disk.
/// Unreadable or unrecognised files yield `None`; this never fails a request.
pub fn probe_audio(path: &Path) -> Option<AudioInfo> {
    let probe = match Probe::open(path).and_then(|p| Ok(p.guess_file_type()?)) {
        Ok(probe) => probe,
        Err(e) => {
            tracing::warn!("Could not open {:?} for probing: {}", path, e);
            return None;
        }
    };

    match probe.read() {
        Ok(tagged_file) => {
            let properties = tagged_file.properties();
            Some(AudioInfo {
                duration_ms: properties.duration().as_millis() as u64,
                sample_rate: properties.sample_rate(),
                channels: properties.channels(),
            })
        }
        Err(e) => {
            tracing::warn!("Could not read audio properties of {:?}: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn silent_wav(seconds: u32, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..(seconds * sample_rate) {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_probe_silent_wav() {
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        file.write_all(&silent_wav(2, 8000)).unwrap();
        file.flush().unwrap();

        let info = probe_audio(file.path()).unwrap();
        assert_eq!(info.duration_ms, 2000);
        assert_eq!(info.sample_rate, Some(8000));
        assert_eq!(info.channels, Some(1));
    }

    #[test]
    fn test_probe_garbage_is_none() {
        let mut file = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
        file.write_all(b"definitely not audio").unwrap();
        file.flush().unwrap();

        assert!(probe_audio(file.path()).is_none());
    }
}
