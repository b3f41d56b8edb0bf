//! In-crate fakes for the media, speech and captioning seams.

use crate::error::{Result, VidloreError};
use crate::frames::{FrameCaptioner, FrameSample};
use crate::media::{AudioExtraction, AudioFormat, MediaBackend, MediaInfo, StreamInfo};
use crate::transcription::{
    DecodeOptions, SpeechModel, SpeechModelLoader, SpeechOutput, TranscriptSegment,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
enum SpeechBehavior {
    Speaking,
    Silent,
    Failing(String),
}

/// Speech model returning canned output.
#[derive(Clone)]
pub struct FakeSpeechModel {
    behavior: SpeechBehavior,
    calls: Arc<AtomicUsize>,
}

impl FakeSpeechModel {
    pub fn speaking() -> Self {
        Self::with_behavior(SpeechBehavior::Speaking)
    }

    pub fn silent() -> Self {
        Self::with_behavior(SpeechBehavior::Silent)
    }

    pub fn failing(message: &str) -> Self {
        Self::with_behavior(SpeechBehavior::Failing(message.to_string()))
    }

    fn with_behavior(behavior: SpeechBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of `transcribe` calls, shared by every clone.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SpeechModel for FakeSpeechModel {
    fn name(&self) -> &str {
        "fake-whisper"
    }

    async fn transcribe(&self, audio_path: &Path, _options: &DecodeOptions) -> Result<SpeechOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(audio_path.exists(), "audio handed to the model must exist");

        match &self.behavior {
            SpeechBehavior::Speaking => Ok(SpeechOutput {
                segments: vec![
                    TranscriptSegment::new(0.0, 4.2, "Welcome to the quarterly review.".to_string()),
                    TranscriptSegment::new(4.2, 9.0, "Revenue grew twelve percent.".to_string()),
                    TranscriptSegment::new(31.0, 36.5, "Questions come at the end.".to_string()),
                ],
                text: " Welcome to the quarterly review. Revenue grew twelve percent. Questions come at the end."
                    .to_string(),
                language: Some("en".to_string()),
            }),
            SpeechBehavior::Silent => Ok(SpeechOutput {
                language: Some("en".to_string()),
                ..SpeechOutput::default()
            }),
            SpeechBehavior::Failing(message) => Err(VidloreError::Transcription(message.clone())),
        }
    }
}

/// Loader that counts invocations and can be switched between success and failure.
pub struct FakeLoader {
    outcome: Mutex<std::result::Result<FakeSpeechModel, String>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeLoader {
    pub fn ok(model: FakeSpeechModel) -> Self {
        Self::with_outcome(Ok(model))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_outcome(Err(message.to_string()))
    }

    fn with_outcome(outcome: std::result::Result<FakeSpeechModel, String>) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn set_succeed(&self, model: FakeSpeechModel) {
        *self.outcome.lock().unwrap() = Ok(model);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechModelLoader for FakeLoader {
    async fn load(&self, _model_size: &str) -> Result<Arc<dyn SpeechModel>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let outcome = self.outcome.lock().unwrap().clone();
        match outcome {
            Ok(model) => Ok(Arc::new(model)),
            Err(message) => Err(VidloreError::ModelLoad(message)),
        }
    }
}

/// How [`FakeMedia`] answers audio extraction.
#[derive(Debug, Clone)]
pub enum AudioBehavior {
    Extract,
    NoTrack,
    Unsupported(String),
}

#[derive(Clone)]
struct FakeVideo {
    info: MediaInfo,
    audio: AudioBehavior,
    decodable_until: Option<f64>,
}

/// Media backend over an in-memory table of videos; unknown paths are unreadable.
#[derive(Default)]
pub struct FakeMedia {
    videos: HashMap<PathBuf, FakeVideo>,
    frame_calls: AtomicUsize,
}

impl FakeMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(
        mut self,
        path: impl Into<PathBuf>,
        duration_seconds: f64,
        has_audio: bool,
        audio: AudioBehavior,
    ) -> Self {
        let audio_streams = if has_audio {
            vec![StreamInfo {
                index: 1,
                codec_name: Some("aac".to_string()),
            }]
        } else {
            Vec::new()
        };

        let info = MediaInfo {
            duration_seconds,
            format_name: Some("mov,mp4,m4a,3gp,3g2,mj2".to_string()),
            video_streams: vec![StreamInfo {
                index: 0,
                codec_name: Some("h264".to_string()),
            }],
            audio_streams,
        };

        self.videos.insert(
            path.into(),
            FakeVideo {
                info,
                audio,
                decodable_until: None,
            },
        );
        self
    }

    /// Frames after `seconds` fail to decode for this video.
    pub fn with_decodable_until(mut self, path: impl AsRef<Path>, seconds: f64) -> Self {
        if let Some(video) = self.videos.get_mut(path.as_ref()) {
            video.decodable_until = Some(seconds);
        }
        self
    }

    pub fn frame_calls(&self) -> usize {
        self.frame_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, path: &Path) -> Result<&FakeVideo> {
        self.videos
            .get(path)
            .ok_or_else(|| VidloreError::unreadable(path, "No such file or directory"))
    }
}

#[async_trait]
impl MediaBackend for FakeMedia {
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        Ok(self.lookup(path)?.info.clone())
    }

    async fn extract_frame(&self, path: &Path, timestamp: f64) -> Result<Option<Vec<u8>>> {
        self.frame_calls.fetch_add(1, Ordering::SeqCst);
        let video = self.lookup(path)?;

        if video.decodable_until.is_some_and(|limit| timestamp > limit) {
            return Ok(None);
        }

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0];
        jpeg.extend_from_slice(format!("{:.3}", timestamp).as_bytes());
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        Ok(Some(jpeg))
    }

    async fn extract_audio(
        &self,
        path: &Path,
        dest: &Path,
        format: AudioFormat,
    ) -> Result<AudioExtraction> {
        let video = self.lookup(path)?;
        if !video.info.has_audio() {
            return Ok(AudioExtraction::NoAudioTrack);
        }

        match &video.audio {
            AudioBehavior::Extract => {
                tokio::fs::write(dest, format.extension().as_bytes()).await?;
                Ok(AudioExtraction::Extracted(dest.to_path_buf()))
            }
            AudioBehavior::NoTrack => Ok(AudioExtraction::NoAudioTrack),
            AudioBehavior::Unsupported(detail) => Ok(AudioExtraction::UnsupportedCodec(detail.clone())),
        }
    }
}

/// Captioner that describes frames by their timestamp.
#[derive(Default)]
pub struct FakeCaptioner {
    failing_at: Vec<f64>,
    calls: AtomicUsize,
}

impl FakeCaptioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(timestamps: &[f64]) -> Self {
        Self {
            failing_at: timestamps.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameCaptioner for FakeCaptioner {
    fn name(&self) -> &str {
        "fake-vision"
    }

    async fn caption(&self, frame: &FrameSample) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_at
            .iter()
            .any(|t| (t - frame.timestamp).abs() < 1e-6)
        {
            return Err(VidloreError::Captioning(format!(
                "rate limited at {:.1}s",
                frame.timestamp
            )));
        }
        Ok(format!("frame at {:.1}s", frame.timestamp))
    }
}
