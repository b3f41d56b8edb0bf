//! Audio track transcription for one video.

use super::{
    DecodeOptions, EmptyReason, SpeechModelHandle, Transcript, TranscriptOutcome,
    TranscriptionFailure,
};
use crate::error::Result;
use crate::media::{AudioExtraction, MediaBackend, VideoAsset};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Maximum characters of transcript text written to the log.
const LOG_SAMPLE_CHARS: usize = 100;

/// Extracts a video's audio and runs it through the speech model.
///
/// Only a speech model that cannot be loaded is returned as an error; every
/// per-file problem becomes a [`TranscriptOutcome`].
pub struct AudioTranscriber {
    model: Arc<SpeechModelHandle>,
    media: Arc<dyn MediaBackend>,
    options: DecodeOptions,
    work_dir: PathBuf,
}

impl AudioTranscriber {
    pub fn new(
        model: Arc<SpeechModelHandle>,
        media: Arc<dyn MediaBackend>,
        options: DecodeOptions,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            model,
            media,
            options,
            work_dir,
        }
    }

    /// The speech model handle shared with the caller.
    pub fn model(&self) -> &Arc<SpeechModelHandle> {
        &self.model
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Transcribe the audio track of a probed video.
    #[instrument(skip(self, video), fields(video = %video.path.display()))]
    pub async fn transcribe(&self, video: &VideoAsset) -> Result<TranscriptOutcome> {
        let model = self.model.get().await?;
        info!("Speech model {} ready", model.name());
        info!("Transcribing audio from {}", video.path.display());

        if !video.has_audio {
            warn!("No transcript for {}: 0 segments, reason: {}", video.name, EmptyReason::NoAudioTrack);
            return Ok(TranscriptOutcome::Empty(EmptyReason::NoAudioTrack));
        }

        let format = model.audio_format();
        let extraction = match self.scratch_dir() {
            Ok(scratch) => {
                let dest = scratch
                    .path()
                    .join(format!("{}.{}", video.id(), format.extension()));
                self.media
                    .extract_audio(&video.path, &dest, format)
                    .await
                    .map(|extraction| (scratch, extraction))
            }
            Err(e) => Err(e),
        };

        // The scratch directory lives until the model is done with the audio.
        let (_scratch, audio_path) = match extraction {
            Ok((scratch, AudioExtraction::Extracted(path))) => (scratch, path),
            Ok((_, AudioExtraction::NoAudioTrack)) => {
                warn!("No transcript for {}: 0 segments, reason: {}", video.name, EmptyReason::NoAudioTrack);
                return Ok(TranscriptOutcome::Empty(EmptyReason::NoAudioTrack));
            }
            Ok((_, AudioExtraction::UnsupportedCodec(detail))) => {
                let reason = EmptyReason::UnsupportedAudioCodec(detail);
                warn!(
                    "No transcript for {}: 0 segments, reason: {} [codec: {}]",
                    video.name,
                    reason,
                    video.audio_codec.as_deref().unwrap_or("unknown")
                );
                return Ok(TranscriptOutcome::Empty(reason));
            }
            Err(e) => {
                let failure = TranscriptionFailure {
                    message: e.to_string(),
                    origin: format!("audio extraction for {}", video.name),
                };
                error!("Audio transcription failed: {}", failure);
                return Ok(TranscriptOutcome::Failed(failure));
            }
        };

        let output = match model.transcribe(&audio_path, &self.options).await {
            Ok(output) => output,
            Err(e) => {
                let failure = TranscriptionFailure {
                    message: e.to_string(),
                    origin: format!("{} decoding {}", model.name(), video.name),
                };
                error!("Audio transcription failed: {}", failure);
                info!("Continuing with video-only processing");
                return Ok(TranscriptOutcome::Failed(failure));
            }
        };

        if output.is_empty() {
            warn!(
                "No transcript text found for {}: 0 segments, reason: {}",
                video.name,
                EmptyReason::NoSpeech
            );
            return Ok(TranscriptOutcome::Empty(EmptyReason::NoSpeech));
        }

        let transcript = Transcript::from_output(video.id(), output);
        info!(
            "Detected language: {}",
            transcript.language.as_deref().unwrap_or("unknown")
        );
        info!("Transcription complete: {} segments", transcript.segments.len());
        info!("Full transcript length: {} characters", transcript.char_len());
        info!("Transcript sample: {}", transcript.sample(LOG_SAMPLE_CHARS));

        Ok(TranscriptOutcome::Transcribed(transcript))
    }

    fn scratch_dir(&self) -> Result<tempfile::TempDir> {
        std::fs::create_dir_all(&self.work_dir)?;
        Ok(tempfile::Builder::new()
            .prefix("audio-")
            .tempdir_in(&self.work_dir)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaBackend, VideoAsset};
    use crate::test_support::{AudioBehavior, FakeLoader, FakeMedia, FakeSpeechModel};
    use std::path::Path;

    async fn setup(
        model: FakeSpeechModel,
        audio: AudioBehavior,
        has_audio: bool,
    ) -> (AudioTranscriber, VideoAsset, tempfile::TempDir) {
        let work = tempfile::tempdir().unwrap();
        let media = FakeMedia::new().with_video("/videos/clip.mp4", 20.0, has_audio, audio);
        let info = media.probe(Path::new("/videos/clip.mp4")).await.unwrap();
        let video = VideoAsset::new(Path::new("/videos/clip.mp4"), &info);

        let handle = Arc::new(SpeechModelHandle::new(Arc::new(FakeLoader::ok(model)), "base"));
        let transcriber = AudioTranscriber::new(
            handle,
            Arc::new(media),
            DecodeOptions::default(),
            work.path().to_path_buf(),
        );
        (transcriber, video, work)
    }

    #[tokio::test]
    async fn test_spoken_audio_produces_segments() {
        let (transcriber, video, _work) =
            setup(FakeSpeechModel::speaking(), AudioBehavior::Extract, true).await;

        let outcome = transcriber.transcribe(&video).await.unwrap();
        let transcript = outcome.transcript().expect("transcribed");

        assert!(transcript.segments.len() > 0);
        assert!(!transcript.full_text.is_empty());
        assert_eq!(transcript.language.as_deref(), Some("en"));

        let joined = transcript
            .segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert!(transcript.full_text.starts_with(&joined));
    }

    #[tokio::test]
    async fn test_no_audio_track_is_empty_not_failed() {
        let model = FakeSpeechModel::speaking();
        let calls = model.call_counter();
        let (transcriber, video, _work) = setup(model, AudioBehavior::Extract, false).await;

        let outcome = transcriber.transcribe(&video).await.unwrap();
        match outcome {
            TranscriptOutcome::Empty(reason) => {
                assert_eq!(reason, EmptyReason::NoAudioTrack);
                assert_eq!(reason.to_string(), "no audio track");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_extraction_reporting_no_stream_is_no_audio_track() {
        let (transcriber, video, _work) =
            setup(FakeSpeechModel::speaking(), AudioBehavior::NoTrack, true).await;

        let outcome = transcriber.transcribe(&video).await.unwrap();
        assert!(matches!(outcome, TranscriptOutcome::Empty(EmptyReason::NoAudioTrack)));
    }

    #[tokio::test]
    async fn test_unsupported_codec_keeps_decoder_error() {
        let (transcriber, video, _work) = setup(
            FakeSpeechModel::speaking(),
            AudioBehavior::Unsupported("Decoder (codec none) not found".to_string()),
            true,
        )
        .await;

        match transcriber.transcribe(&video).await.unwrap() {
            TranscriptOutcome::Empty(EmptyReason::UnsupportedAudioCodec(detail)) => {
                assert!(detail.contains("Decoder"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_runtime_failure_is_recovered() {
        let (transcriber, video, _work) = setup(
            FakeSpeechModel::failing("malformed audio buffer"),
            AudioBehavior::Extract,
            true,
        )
        .await;

        match transcriber.transcribe(&video).await.unwrap() {
            TranscriptOutcome::Failed(failure) => {
                assert!(failure.message.contains("malformed audio buffer"));
                assert!(failure.origin.contains("clip.mp4"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_silence_is_no_speech() {
        let (transcriber, video, _work) =
            setup(FakeSpeechModel::silent(), AudioBehavior::Extract, true).await;

        let outcome = transcriber.transcribe(&video).await.unwrap();
        assert!(matches!(outcome, TranscriptOutcome::Empty(EmptyReason::NoSpeech)));
    }

    #[tokio::test]
    async fn test_model_load_failure_escalates() {
        let work = tempfile::tempdir().unwrap();
        let media = FakeMedia::new().with_video("/videos/clip.mp4", 20.0, true, AudioBehavior::Extract);
        let info = media.probe(Path::new("/videos/clip.mp4")).await.unwrap();
        let video = VideoAsset::new(Path::new("/videos/clip.mp4"), &info);
        let handle = Arc::new(SpeechModelHandle::new(
            Arc::new(FakeLoader::failing("missing runtime")),
            "base",
        ));
        let transcriber =
            AudioTranscriber::new(handle, Arc::new(media), DecodeOptions::default(), work.path().to_path_buf());

        let err = transcriber.transcribe(&video).await.unwrap_err();
        assert!(err.is_model_load());
    }

    #[tokio::test]
    async fn test_scratch_audio_is_removed() {
        let (transcriber, video, work) =
            setup(FakeSpeechModel::speaking(), AudioBehavior::Extract, true).await;

        transcriber.transcribe(&video).await.unwrap();
        let leftovers = std::fs::read_dir(work.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
