//! CLI output formatting utilities.

use crate::aggregate::IngestResult;
use crate::transcription::TranscriptOutcome;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    pub fn info(msg: &str) {
        eprintln!("{} {}", style(">>").cyan().bold(), msg);
    }

    pub fn success(msg: &str) {
        eprintln!("{} {}", style(">>").green().bold(), msg);
    }

    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    pub fn header(msg: &str) {
        eprintln!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        eprintln!("  {}: {}", style(key).dim(), value);
    }

    /// One-line summary of an ingested video.
    pub fn ingest_summary(result: &IngestResult) {
        let transcript = match &result.transcript {
            Some(outcome) => transcript_status(outcome),
            None => style("transcription skipped").red().to_string(),
        };
        eprintln!(
            "  {} {} ({}, {} frames, {} captions, {})",
            style("*").cyan(),
            style(&result.video.name).bold(),
            format_duration(result.video.duration_seconds),
            result.frames.len(),
            result.frame_texts().len(),
            transcript
        );
    }

    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

fn transcript_status(outcome: &TranscriptOutcome) -> String {
    match outcome {
        TranscriptOutcome::Transcribed(_) => style(outcome.describe()).green().to_string(),
        TranscriptOutcome::Empty(_) => style(outcome.describe()).yellow().to_string(),
        TranscriptOutcome::Failed(_) => style(outcome.describe()).red().to_string(),
    }
}

/// Format duration in seconds to a human-readable string.
pub(crate) fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(9.96), "9s");
        assert_eq!(format_duration(600.0), "10m 0s");
        assert_eq!(format_duration(3725.0), "1h 2m 5s");
        assert_eq!(format_duration(-1.0), "0s");
    }
}
