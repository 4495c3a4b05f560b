pub mod audio_info;
pub mod gemini;
pub mod intake;
pub mod summarizer;
