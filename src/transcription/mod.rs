//! Transcription module for vidlore.
//!
//! Turns the audio track of a video into timestamped segments.
//!
//! # Providers
//!
//! - **Local** (default): the `whisper` runtime, loaded once per process.
//! - **OpenAI**: the hosted Whisper API.
//!
//! Both sit behind [`SpeechModelLoader`]/[`SpeechModel`]; the loaded model is owned by a
//! [`SpeechModelHandle`] that the [`AudioTranscriber`] receives explicitly.

mod format;
mod handle;
mod hosted;
mod local;
mod models;
mod outcome;
mod transcriber;

pub use format::{format_outcome, format_transcript, OutputFormat, SegmentExport, TranscriptExport};
pub use handle::{ModelStatus, SpeechModelHandle};
pub use hosted::{is_api_key_configured, HostedWhisperLoader, HostedWhisperModel};
pub use local::{parse_whisper_json, LocalWhisperLoader, LocalWhisperModel, KNOWN_MODEL_SIZES};
pub use models::{SpeechOutput, Transcript, TranscriptSegment};
pub use outcome::{EmptyReason, TranscriptOutcome, TranscriptionFailure};
pub use transcriber::AudioTranscriber;

use crate::config::{Settings, SpeechProvider, TranscriptionSettings};
use crate::error::Result;
use crate::media::AudioFormat;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Decoding policy passed to every transcription call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Stream per-segment progress into the log.
    pub verbose: bool,
    /// Use half-precision decoding.
    pub fp16: bool,
    /// Request word-level timestamp alignment.
    pub word_timestamps: bool,
    /// Language hint; detected automatically when `None`.
    pub language: Option<String>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            verbose: true,
            fp16: false,
            word_timestamps: false,
            language: None,
        }
    }
}

impl From<&TranscriptionSettings> for DecodeOptions {
    fn from(settings: &TranscriptionSettings) -> Self {
        Self {
            verbose: settings.verbose,
            fp16: !settings.precision_compatibility_mode,
            word_timestamps: settings.word_timestamps,
            language: settings.language.clone(),
        }
    }
}

/// A loaded speech-to-text model.
#[async_trait]
pub trait SpeechModel: Send + Sync {
    /// Human-readable model name, used in logs and failure origins.
    fn name(&self) -> &str;

    /// Audio format the model wants as input.
    fn audio_format(&self) -> AudioFormat {
        AudioFormat::Wav16kMono
    }

    /// Transcribe an audio file.
    async fn transcribe(&self, audio_path: &Path, options: &DecodeOptions) -> Result<SpeechOutput>;
}

/// Loads a speech model; failures surface as `ModelLoad`.
#[async_trait]
pub trait SpeechModelLoader: Send + Sync {
    async fn load(&self, model_size: &str) -> Result<Arc<dyn SpeechModel>>;
}

/// Create the loader for the configured provider.
pub fn create_loader(settings: &Settings) -> Arc<dyn SpeechModelLoader> {
    match settings.transcription.provider {
        SpeechProvider::Local => Arc::new(LocalWhisperLoader::from_settings(settings)),
        SpeechProvider::OpenAI => Arc::new(HostedWhisperLoader::from_settings(settings)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_options_from_settings() {
        let settings = TranscriptionSettings::default();
        let options = DecodeOptions::from(&settings);
        assert!(options.verbose);
        assert!(!options.fp16);
        assert!(!options.word_timestamps);
        assert_eq!(options.language, None);

        let settings = TranscriptionSettings {
            precision_compatibility_mode: false,
            language: Some("no".to_string()),
            ..TranscriptionSettings::default()
        };
        let options = DecodeOptions::from(&settings);
        assert!(options.fp16);
        assert_eq!(options.language.as_deref(), Some("no"));
    }
}
