//! Transcript export (JSON, SRT, WebVTT).

use super::{Transcript, TranscriptOutcome};
use serde::Serialize;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Srt,
    Vtt,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "srt" => Ok(OutputFormat::Srt),
            "vtt" | "webvtt" => Ok(OutputFormat::Vtt),
            _ => Err(format!("Unknown format: {}. Use json, srt, or vtt.", s)),
        }
    }
}

/// JSON shape of an exported transcript.
#[derive(Debug, Serialize)]
pub struct TranscriptExport {
    pub video_id: String,
    pub language: Option<String>,
    pub duration_seconds: f64,
    pub segment_count: usize,
    pub full_text: String,
    pub segments: Vec<SegmentExport>,
}

#[derive(Debug, Serialize)]
pub struct SegmentExport {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

impl From<&Transcript> for TranscriptExport {
    fn from(transcript: &Transcript) -> Self {
        Self {
            video_id: transcript.video_id.clone(),
            language: transcript.language.clone(),
            duration_seconds: transcript.duration_seconds,
            segment_count: transcript.segments.len(),
            full_text: transcript.full_text.clone(),
            segments: transcript
                .segments
                .iter()
                .map(|s| SegmentExport {
                    start_seconds: s.start_seconds,
                    end_seconds: s.end_seconds,
                    text: s.text.clone(),
                })
                .collect(),
        }
    }
}

/// Render a transcript in the requested format.
pub fn format_transcript(transcript: &Transcript, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&TranscriptExport::from(transcript))
            .unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Srt => cues(transcript, ','),
        OutputFormat::Vtt => format!("WEBVTT\n\n{}", cues(transcript, '.')),
    }
}

/// Render any outcome; empty and failed outcomes have no cues, so JSON carries the reason.
pub fn format_outcome(outcome: &TranscriptOutcome, format: OutputFormat) -> String {
    match (outcome, format) {
        (TranscriptOutcome::Transcribed(transcript), _) => format_transcript(transcript, format),
        (_, OutputFormat::Json) => {
            serde_json::to_string_pretty(outcome).unwrap_or_else(|_| "{}".to_string())
        }
        (_, OutputFormat::Srt) => String::new(),
        (_, OutputFormat::Vtt) => "WEBVTT\n\n".to_string(),
    }
}

fn cues(transcript: &Transcript, ms_separator: char) -> String {
    transcript
        .segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            format!(
                "{}\n{} --> {}\n{}\n\n",
                i + 1,
                cue_timestamp(segment.start_seconds, ms_separator),
                cue_timestamp(segment.end_seconds, ms_separator),
                segment.text
            )
        })
        .collect()
}

/// `HH:MM:SS<sep>mmm`, with `,` for SRT and `.` for WebVTT.
fn cue_timestamp(seconds: f64, ms_separator: char) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        total_ms / 3_600_000,
        (total_ms % 3_600_000) / 60_000,
        (total_ms % 60_000) / 1000,
        ms_separator,
        total_ms % 1000
    )
}
