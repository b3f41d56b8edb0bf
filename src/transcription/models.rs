//! Data models for transcription.

use serde::{Deserialize, Serialize};

/// Raw output of a speech model for one audio file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeechOutput {
    /// Segments in the order the model emitted them.
    pub segments: Vec<TranscriptSegment>,
    /// Full transcript text as reported by the model.
    pub text: String,
    /// Language the model detected (or was told to use).
    pub language: Option<String>,
}

impl SpeechOutput {
    /// True when the model produced neither segments nor text.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.text.trim().is_empty()
    }
}

/// A complete transcript with segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Video ID this transcript belongs to.
    pub video_id: String,
    /// Individual transcript segments with timestamps, ordered by start.
    pub segments: Vec<TranscriptSegment>,
    /// Full transcript text.
    pub full_text: String,
    /// Detected language, when known.
    pub language: Option<String>,
    /// End of the last segment in seconds.
    pub duration_seconds: f64,
}

impl Transcript {
    /// Create a new transcript from segments, joining their text.
    pub fn new(video_id: String, segments: Vec<TranscriptSegment>) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self::with_text(video_id, segments, full_text, None)
    }

    /// Create a transcript from model output, keeping the model's own full text.
    ///
    /// Segments are sorted by start time and the full text falls back to the
    /// joined segment text when the model reported none.
    pub fn from_output(video_id: String, output: SpeechOutput) -> Self {
        let SpeechOutput {
            mut segments,
            text,
            language,
        } = output;

        segments.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));

        let full_text = if text.trim().is_empty() {
            segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            text.trim().to_string()
        };

        Self::with_text(video_id, segments, full_text, language)
    }

    fn with_text(
        video_id: String,
        segments: Vec<TranscriptSegment>,
        full_text: String,
        language: Option<String>,
    ) -> Self {
        let duration_seconds = segments
            .last()
            .map(|s| s.end_seconds)
            .unwrap_or(0.0);

        Self {
            video_id,
            segments,
            full_text,
            language,
            duration_seconds,
        }
    }

    /// Number of characters in the full text.
    pub fn char_len(&self) -> usize {
        self.full_text.chars().count()
    }

    /// The first `max_chars` characters of the transcript, for log lines.
    pub fn sample(&self, max_chars: usize) -> String {
        let source = self
            .segments
            .first()
            .map(|s| s.text.as_str())
            .unwrap_or(self.full_text.as_str());
        truncate_chars(source, max_chars)
    }
}

/// A single segment of a transcript with timestamp information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Transcribed text content.
    pub text: String,
}

impl TranscriptSegment {
    /// Create a new transcript segment.
    pub fn new(start_seconds: f64, end_seconds: f64, text: String) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text,
        }
    }
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
