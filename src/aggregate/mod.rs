//! Result aggregation.
//!
//! Combines captioned frames and the transcript of one video into an
//! [`IngestDocument`]: a single ordered text plus fixed-duration chunks that the
//! indexer can embed independently. Pure formatting; nothing here fails.

use crate::frames::CaptionedFrame;
use crate::media::VideoAsset;
use crate::transcription::{TranscriptOutcome, TranscriptSegment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything learned about one video in an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResult {
    pub video: VideoAsset,
    /// Captioned frames in timestamp order.
    pub frames: Vec<CaptionedFrame>,
    /// `None` only when the speech model was unavailable and transcription was skipped.
    pub transcript: Option<TranscriptOutcome>,
    pub ingested_at: DateTime<Utc>,
}

impl IngestResult {
    pub fn new(
        video: VideoAsset,
        frames: Vec<CaptionedFrame>,
        transcript: Option<TranscriptOutcome>,
    ) -> Self {
        Self {
            video,
            frames,
            transcript,
            ingested_at: Utc::now(),
        }
    }

    /// Captions of the frames that have one, tagged with their timestamp.
    pub fn frame_texts(&self) -> Vec<String> {
        self.frames
            .iter()
            .filter_map(|f| f.caption.as_ref().map(|c| format_tagged(f.timestamp, c)))
            .collect()
    }

    pub fn full_text(&self) -> &str {
        self.transcript.as_ref().map(|t| t.full_text()).unwrap_or("")
    }

    pub fn detected_language(&self) -> Option<&str> {
        self.transcript.as_ref().and_then(|t| t.language())
    }

    pub fn segment_count(&self) -> usize {
        self.transcript.as_ref().map(|t| t.segment_count()).unwrap_or(0)
    }

    fn segments(&self) -> &[TranscriptSegment] {
        self.transcript
            .as_ref()
            .and_then(|t| t.transcript())
            .map(|t| t.segments.as_slice())
            .unwrap_or(&[])
    }

    /// Aggregate into a document with `window_seconds` chunks.
    pub fn to_document(&self, window_seconds: f64) -> IngestDocument {
        build_document(self, window_seconds)
    }
}

/// A time window of a video, ready for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoChunk {
    /// File name of the source video.
    pub source: String,
    pub text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    /// Position of the chunk within the video.
    pub order: usize,
}

impl VideoChunk {
    /// `"0.0s-30.0s"`.
    pub fn time_range(&self) -> String {
        format!("{:.1}s-{:.1}s", self.start_seconds, self.end_seconds)
    }
}

/// The aggregated text of one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestDocument {
    pub source: String,
    /// Empty when the video yielded neither captions nor speech.
    pub text: String,
    pub chunks: Vec<VideoChunk>,
}

impl IngestDocument {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

fn format_tagged(seconds: f64, text: &str) -> String {
    format!("[{:.1}s] {}", seconds, text)
}

/// Build the document for one ingest result.
pub fn build_document(result: &IngestResult, window_seconds: f64) -> IngestDocument {
    let visual = result.frame_texts();
    let segments = result.segments();

    let audio: Vec<String> = if segments.is_empty() {
        let text = result.full_text().trim();
        if text.is_empty() {
            Vec::new()
        } else {
            vec![text.to_string()]
        }
    } else {
        segments
            .iter()
            .map(|s| format_tagged(s.start_seconds, &s.text))
            .collect()
    };

    let text = if visual.is_empty() && audio.is_empty() {
        String::new()
    } else {
        let mut parts = vec![
            format!("[Video: {}]", result.video.name),
            format!("[Duration: {:.1}s]", result.video.duration_seconds),
        ];
        push_section(&mut parts, "Visual Content:", visual);
        push_section(&mut parts, "Audio Transcript:", audio);
        parts.join("\n")
    };

    IngestDocument {
        source: result.video.name.clone(),
        text,
        chunks: window_chunks(result, window_seconds),
    }
}

fn push_section(parts: &mut Vec<String>, heading: &str, lines: Vec<String>) {
    if !lines.is_empty() {
        parts.push(format!("\n{}", heading));
        parts.extend(lines);
    }
}

/// Split a result into fixed windows of captions and segments.
///
/// Window `i` spans `[i*W, min((i+1)*W, D))`; the final window also takes items at
/// exactly `D`. Items are placed by their start time and empty windows are skipped.
pub fn window_chunks(result: &IngestResult, window_seconds: f64) -> Vec<VideoChunk> {
    if !(window_seconds.is_finite() && window_seconds > 0.0) {
        return Vec::new();
    }

    let segments = result.segments();
    let captions: Vec<(f64, &str)> = result
        .frames
        .iter()
        .filter_map(|f| f.caption.as_deref().map(|c| (f.timestamp, c)))
        .collect();

    // Content past an under-reported container duration still gets a window.
    let duration = captions
        .iter()
        .map(|(t, _)| *t)
        .chain(segments.iter().map(|s| s.start_seconds))
        .fold(result.video.duration_seconds.max(0.0), f64::max);

    let window_count = (duration / window_seconds).floor() as usize + 1;
    let window_of = |t: f64| ((t / window_seconds).floor() as usize).min(window_count - 1);

    // Only windows that hold something are visited.
    let mut occupied: BTreeMap<usize, (Vec<String>, Vec<String>)> = BTreeMap::new();
    for (t, caption) in &captions {
        occupied
            .entry(window_of(*t))
            .or_default()
            .0
            .push(format_tagged(*t, caption));
    }
    for segment in segments {
        occupied
            .entry(window_of(segment.start_seconds))
            .or_default()
            .1
            .push(format_tagged(segment.start_seconds, &segment.text));
    }

    occupied
        .into_iter()
        .enumerate()
        .map(|(order, (i, (visual, audio)))| {
            let start = i as f64 * window_seconds;
            let end = ((i + 1) as f64 * window_seconds).min(duration);

            let mut parts = vec![
                format!("[Video: {}]", result.video.name),
                format!("[Time: {:.1}s - {:.1}s]", start, end),
            ];
            push_section(&mut parts, "Visual Content:", visual);
            push_section(&mut parts, "Audio Transcript:", audio);

            VideoChunk {
                source: result.video.name.clone(),
                text: parts.join("\n"),
                start_seconds: start,
                end_seconds: end,
                order,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaInfo;
    use crate::transcription::{EmptyReason, Transcript};
    use std::path::Path;

    fn video(duration: f64) -> VideoAsset {
        let info = MediaInfo {
            duration_seconds: duration,
            ..MediaInfo::default()
        };
        VideoAsset::new(Path::new("/videos/demo.mp4"), &info)
    }

    fn frames(items: &[(f64, Option<&str>)]) -> Vec<CaptionedFrame> {
        items
            .iter()
            .map(|(t, c)| CaptionedFrame {
                timestamp: *t,
                caption: c.map(str::to_string),
            })
            .collect()
    }

    fn transcribed(segments: Vec<TranscriptSegment>) -> Option<TranscriptOutcome> {
        Some(TranscriptOutcome::Transcribed(Transcript::new(
            "demo".to_string(),
            segments,
        )))
    }

    #[test]
    fn test_document_orders_visual_then_audio() {
        let result = IngestResult::new(
            video(12.0),
            frames(&[(0.0, Some("A title slide")), (5.0, None), (10.0, Some("A bar chart"))]),
            transcribed(vec![
                TranscriptSegment::new(0.0, 4.0, "Hello.".to_string()),
                TranscriptSegment::new(4.0, 9.5, "Look at this chart.".to_string()),
            ]),
        );

        let doc = result.to_document(30.0);
        assert_eq!(doc.source, "demo.mp4");
        assert_eq!(
            doc.text,
            "[Video: demo.mp4]\n[Duration: 12.0s]\n\nVisual Content:\n[0.0s] A title slide\n[10.0s] A bar chart\n\nAudio Transcript:\n[0.0s] Hello.\n[4.0s] Look at this chart."
        );
    }

    #[test]
    fn test_empty_result_gives_empty_document() {
        let result = IngestResult::new(
            video(9.96),
            frames(&[(0.0, None), (5.0, None)]),
            Some(TranscriptOutcome::Empty(EmptyReason::NoAudioTrack)),
        );

        let doc = result.to_document(30.0);
        assert!(doc.is_empty());
        assert!(doc.chunks.is_empty());
        assert_eq!(result.segment_count(), 0);
        assert_eq!(result.full_text(), "");
    }

    #[test]
    fn test_transcript_without_segments_is_untagged() {
        let outcome = TranscriptOutcome::Transcribed(Transcript::from_output(
            "demo".to_string(),
            crate::transcription::SpeechOutput {
                segments: Vec::new(),
                text: "Just the words.".to_string(),
                language: Some("en".to_string()),
            },
        ));
        let result = IngestResult::new(video(4.0), Vec::new(), Some(outcome));

        let doc = result.to_document(30.0);
        assert!(doc.text.ends_with("Audio Transcript:\nJust the words."));
        assert!(!doc.text.contains("Visual Content:"));
        assert_eq!(result.detected_language(), Some("en"));
    }

    #[test]
    fn test_windows_split_by_start_time() {
        let result = IngestResult::new(
            video(65.0),
            frames(&[(0.0, Some("intro")), (35.0, Some("demo")), (60.0, Some("outro"))]),
            transcribed(vec![
                TranscriptSegment::new(2.0, 31.0, "spans the boundary".to_string()),
                TranscriptSegment::new(40.0, 45.0, "second window".to_string()),
            ]),
        );

        let chunks = window_chunks(&result, 30.0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].time_range(), "0.0s-30.0s");
        assert!(chunks[0].text.contains("[2.0s] spans the boundary"));
        assert!(!chunks[1].text.contains("spans the boundary"));
        assert!(chunks[1].text.contains("[35.0s] demo"));
        assert_eq!(chunks[2].time_range(), "60.0s-65.0s");
        assert_eq!(chunks[2].order, 2);
        assert_eq!(
            chunks[0].text,
            "[Video: demo.mp4]\n[Time: 0.0s - 30.0s]\n\nVisual Content:\n[0.0s] intro\n\nAudio Transcript:\n[2.0s] spans the boundary"
        );
    }

    #[test]
    fn test_frame_at_duration_is_kept() {
        let result = IngestResult::new(
            video(30.0),
            frames(&[(25.0, Some("almost")), (30.0, Some("last frame"))]),
            None,
        );

        let chunks = window_chunks(&result, 30.0);
        let all: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert!(all.contains("[30.0s] last frame"));
        assert!(all.contains("[25.0s] almost"));
    }

    #[test]
    fn test_tiny_window_only_builds_occupied_chunks() {
        let captioned: Vec<(f64, Option<&str>)> =
            (0..50).map(|i| (i as f64 * 5.0, Some("slide"))).collect();
        let result = IngestResult::new(video(600.0), frames(&captioned), None);

        let chunks = window_chunks(&result, 0.0005);
        assert_eq!(chunks.len(), 50);
        assert!(chunks.windows(2).all(|w| w[0].start_seconds < w[1].start_seconds));
        assert!(chunks.iter().enumerate().all(|(i, c)| c.order == i));
        assert!((chunks[49].start_seconds - 245.0).abs() < 0.001);
    }

    #[test]
    fn test_unknown_duration_still_windows_content() {
        let result = IngestResult::new(
            video(0.0),
            Vec::new(),
            transcribed(vec![TranscriptSegment::new(50.0, 52.0, "late".to_string())]),
        );

        let chunks = window_chunks(&result, 30.0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_seconds, 30.0);
        assert_eq!(chunks[0].end_seconds, 50.0);
    }
}
