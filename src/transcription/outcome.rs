//! Tagged result of transcribing one video.

use super::Transcript;
use serde::{Deserialize, Serialize};

/// Why a transcription legitimately produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum EmptyReason {
    /// The container has no audio stream.
    NoAudioTrack,
    /// An audio stream exists but could not be decoded.
    UnsupportedAudioCodec(String),
    /// The model ran and heard no speech.
    NoSpeech,
}

impl std::fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmptyReason::NoAudioTrack => write!(f, "no audio track"),
            EmptyReason::UnsupportedAudioCodec(detail) => {
                write!(f, "codec unsupported ({})", detail)
            }
            EmptyReason::NoSpeech => write!(f, "no speech detected"),
        }
    }
}

/// The model loaded but failed while decoding this file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionFailure {
    /// The underlying error message.
    pub message: String,
    /// Where the failure originated (model name and stage).
    pub origin: String,
}

impl std::fmt::Display for TranscriptionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (in {})", self.message, self.origin)
    }
}

/// Outcome of transcribing one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum TranscriptOutcome {
    /// The model produced at least some text.
    Transcribed(Transcript),
    /// Nothing to transcribe; not a fault.
    Empty(EmptyReason),
    /// Decoding broke for this file; recovered locally.
    Failed(TranscriptionFailure),
}

impl TranscriptOutcome {
    pub fn transcript(&self) -> Option<&Transcript> {
        match self {
            TranscriptOutcome::Transcribed(t) => Some(t),
            _ => None,
        }
    }

    pub fn segment_count(&self) -> usize {
        self.transcript().map(|t| t.segments.len()).unwrap_or(0)
    }

    pub fn full_text(&self) -> &str {
        self.transcript().map(|t| t.full_text.as_str()).unwrap_or("")
    }

    pub fn language(&self) -> Option<&str> {
        self.transcript().and_then(|t| t.language.as_deref())
    }

    /// Short human-readable status, used in CLI summaries.
    pub fn describe(&self) -> String {
        match self {
            TranscriptOutcome::Transcribed(t) => format!("{} segments", t.segments.len()),
            TranscriptOutcome::Empty(reason) => format!("0 segments ({})", reason),
            TranscriptOutcome::Failed(failure) => format!("failed: {}", failure),
        }
    }
}
