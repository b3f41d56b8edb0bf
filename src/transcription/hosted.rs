//! Hosted OpenAI Whisper transcription.

use super::{DecodeOptions, SpeechModel, SpeechModelLoader, SpeechOutput, TranscriptSegment};
use crate::config::Settings;
use crate::error::{Result, VidloreError};
use crate::media::{split_audio, AudioFormat, FfmpegBackend};
use crate::openai::create_client;
use async_openai::types::{
    AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs, TimestampGranularity,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Check if the OpenAI API key is configured.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok_and(|key| !key.trim().is_empty())
}

/// Loads a [`HostedWhisperModel`] once the API key is present.
pub struct HostedWhisperLoader {
    model: String,
    chunk_duration_seconds: u32,
    max_concurrent_pieces: usize,
    work_dir: PathBuf,
}

impl HostedWhisperLoader {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.transcription.hosted_model.clone(),
            chunk_duration_seconds: settings.transcription.chunk_duration_seconds,
            max_concurrent_pieces: settings.transcription.max_concurrent_pieces.max(1),
            work_dir: settings.temp_dir().join("hosted"),
        }
    }
}

#[async_trait]
impl SpeechModelLoader for HostedWhisperLoader {
    async fn load(&self, _model_size: &str) -> Result<Arc<dyn SpeechModel>> {
        if !is_api_key_configured() {
            return Err(VidloreError::ModelLoad(
                "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
            ));
        }

        let client = create_client().map_err(|e| VidloreError::ModelLoad(e.to_string()))?;

        Ok(Arc::new(HostedWhisperModel {
            client,
            model: self.model.clone(),
            chunk_duration_seconds: self.chunk_duration_seconds,
            max_concurrent_pieces: self.max_concurrent_pieces,
            backend: FfmpegBackend::new(),
            work_dir: self.work_dir.clone(),
        }))
    }
}

/// OpenAI Whisper API transcriber.
pub struct HostedWhisperModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    chunk_duration_seconds: u32,
    max_concurrent_pieces: usize,
    backend: FfmpegBackend,
    work_dir: PathBuf,
}

impl HostedWhisperModel {
    /// Transcribe a single audio piece (no splitting).
    #[instrument(skip(self, options), fields(audio_path = %audio_path.display()))]
    async fn transcribe_piece(
        &self,
        audio_path: &Path,
        options: &DecodeOptions,
    ) -> Result<(Vec<TranscriptSegment>, String, Option<String>)> {
        let file_bytes = tokio::fs::read(audio_path).await?;

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson);

        if options.word_timestamps {
            request_builder.timestamp_granularities(vec![
                TimestampGranularity::Segment,
                TimestampGranularity::Word,
            ]);
        }

        if let Some(lang) = &options.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| VidloreError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| VidloreError::OpenAI(format!("Whisper API error: {}", e)))?;

        let segments: Vec<TranscriptSegment> = response
            .segments
            .map(|segs| {
                segs.iter()
                    .filter(|s| !s.text.trim().is_empty())
                    .map(|s| {
                        TranscriptSegment::new(s.start as f64, s.end as f64, s.text.trim().to_string())
                    })
                    .collect()
            })
            .unwrap_or_else(|| {
                if response.text.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![TranscriptSegment::new(
                        0.0,
                        response.duration as f64,
                        response.text.trim().to_string(),
                    )]
                }
            });

        let language = Some(response.language).filter(|l| !l.is_empty());
        Ok((segments, response.text.trim().to_string(), language))
    }
}

#[async_trait]
impl SpeechModel for HostedWhisperModel {
    fn name(&self) -> &str {
        &self.model
    }

    fn audio_format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    async fn transcribe(&self, audio_path: &Path, options: &DecodeOptions) -> Result<SpeechOutput> {
        std::fs::create_dir_all(&self.work_dir)?;
        let temp_dir = tempfile::tempdir_in(&self.work_dir)?;
        let pieces = split_audio(
            &self.backend,
            audio_path,
            temp_dir.path(),
            self.chunk_duration_seconds,
        )
        .await?;

        let piece_count = pieces.len();
        if piece_count > 1 {
            info!("Processing {} audio pieces with {}", piece_count, self.model);
        }

        // Pieces run concurrently but come back in order, so offsets stay monotonic.
        let mut results = stream::iter(pieces.into_iter().enumerate())
            .map(|(idx, (piece_path, offset))| async move {
                let result = self.transcribe_piece(&piece_path, options).await;
                (idx, offset, result)
            })
            .buffered(self.max_concurrent_pieces);

        let mut transcribed = Vec::with_capacity(piece_count);
        while let Some((idx, offset, result)) = results.next().await {
            let (segments, text, language) = result.map_err(|e| {
                VidloreError::Transcription(format!("piece {} at {:.0}s failed: {}", idx, offset, e))
            })?;
            debug!("Piece {} produced {} segments", idx, segments.len());
            transcribed.push(PieceTranscript {
                offset_seconds: offset,
                segments,
                text,
                language,
            });
        }

        Ok(merge_pieces(transcribed, options.verbose))
    }
}

/// Transcription of one audio piece, with timestamps relative to the piece.
#[derive(Debug, Clone)]
pub(crate) struct PieceTranscript {
    pub offset_seconds: f64,
    pub segments: Vec<TranscriptSegment>,
    pub text: String,
    pub language: Option<String>,
}

/// Join pieces, given in playback order, into one output on the source timeline.
///
/// The language is the first one any piece reported.
pub(crate) fn merge_pieces(pieces: Vec<PieceTranscript>, verbose: bool) -> SpeechOutput {
    let mut output = SpeechOutput::default();
    let mut texts = Vec::with_capacity(pieces.len());

    for piece in pieces {
        for mut segment in piece.segments {
            segment.start_seconds += piece.offset_seconds;
            segment.end_seconds += piece.offset_seconds;
            if verbose {
                info!(
                    "[{:.2} --> {:.2}] {}",
                    segment.start_seconds, segment.end_seconds, segment.text
                );
            }
            output.segments.push(segment);
        }
        if !piece.text.is_empty() {
            texts.push(piece.text);
        }
        if output.language.is_none() {
            output.language = piece.language;
        }
    }

    output.text = texts.join(" ");
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(offset: f64, spans: &[(f64, f64, &str)], language: Option<&str>) -> PieceTranscript {
        let segments: Vec<TranscriptSegment> = spans
            .iter()
            .map(|&(start, end, text)| TranscriptSegment::new(start, end, text.to_string()))
            .collect();
        let text = spans.iter().map(|s| s.2).collect::<Vec<_>>().join(" ");
        PieceTranscript {
            offset_seconds: offset,
            segments,
            text,
            language: language.map(str::to_string),
        }
    }

    #[test]
    fn test_merge_offsets_segments_in_piece_order() {
        let output = merge_pieces(
            vec![
                piece(0.0, &[(0.0, 4.0, "Welcome back."), (4.0, 9.5, "Today we cover caching.")], Some("en")),
                piece(600.0, &[(1.0, 6.0, "First, eviction.")], Some("en")),
                piece(1200.0, &[(0.5, 3.0, "Questions?")], None),
            ],
            false,
        );

        let spans: Vec<(f64, f64)> = output
            .segments
            .iter()
            .map(|s| (s.start_seconds, s.end_seconds))
            .collect();
        assert_eq!(spans, vec![(0.0, 4.0), (4.0, 9.5), (601.0, 606.0), (1200.5, 1203.0)]);
        assert!(output.segments.windows(2).all(|w| w[0].start_seconds <= w[1].start_seconds));
        assert_eq!(
            output.text,
            "Welcome back. Today we cover caching. First, eviction. Questions?"
        );
        assert_eq!(output.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_merge_takes_first_reported_language_and_skips_silent_pieces() {
        let output = merge_pieces(
            vec![
                piece(0.0, &[], None),
                piece(600.0, &[(2.0, 5.0, "Hei og velkommen.")], Some("no")),
                piece(1200.0, &[(0.0, 1.0, "Thanks.")], Some("en")),
            ],
            true,
        );

        assert_eq!(output.language.as_deref(), Some("no"));
        assert_eq!(output.text, "Hei og velkommen. Thanks.");
        assert_eq!(output.segments[0].start_seconds, 602.0);
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        let output = merge_pieces(Vec::new(), false);
        assert!(output.segments.is_empty());
        assert!(output.text.is_empty());
        assert_eq!(output.language, None);
    }

    #[test]
    fn test_loader_reads_settings() {
        let settings = Settings::default();
        let loader = HostedWhisperLoader::from_settings(&settings);
        assert_eq!(loader.model, "whisper-1");
        assert_eq!(loader.chunk_duration_seconds, 600);
        assert_eq!(loader.max_concurrent_pieces, 3);
        assert!(loader.work_dir.ends_with("hosted"));
    }
}
