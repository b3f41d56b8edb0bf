//! Media access for vidlore.
//!
//! Probing, frame extraction and audio extraction sit behind the [`MediaBackend`]
//! trait; [`FfmpegBackend`] implements it with the `ffprobe`/`ffmpeg` tools.

mod ffmpeg;
mod source;

pub use ffmpeg::{parse_probe_output, split_audio, FfmpegBackend};
pub use source::{discover_videos, is_video_file, VIDEO_EXTENSIONS};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A single stream found in a media container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Stream index within the container.
    pub index: u32,
    /// Codec short name as reported by the prober.
    pub codec_name: Option<String>,
}

/// Facts about a media container obtained by probing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Total duration in seconds (0 when the container does not report one).
    pub duration_seconds: f64,
    /// Container format name.
    pub format_name: Option<String>,
    pub video_streams: Vec<StreamInfo>,
    pub audio_streams: Vec<StreamInfo>,
}

impl MediaInfo {
    pub fn has_video(&self) -> bool {
        !self.video_streams.is_empty()
    }

    pub fn has_audio(&self) -> bool {
        !self.audio_streams.is_empty()
    }

    /// Codec of the first audio stream, if any.
    pub fn audio_codec(&self) -> Option<&str> {
        self.audio_streams
            .first()
            .and_then(|s| s.codec_name.as_deref())
    }
}

/// A probed video file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAsset {
    /// Path the video was read from.
    pub path: PathBuf,
    /// File name used to label documents and chunks.
    pub name: String,
    /// Total duration in seconds.
    pub duration_seconds: f64,
    /// Whether the container has at least one audio stream.
    pub has_audio: bool,
    /// Codec of the first audio stream.
    pub audio_codec: Option<String>,
}

impl VideoAsset {
    pub fn new(path: &Path, info: &MediaInfo) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Self {
            path: path.to_path_buf(),
            name,
            duration_seconds: info.duration_seconds,
            has_audio: info.has_audio(),
            audio_codec: info.audio_codec().map(str::to_string),
        }
    }

    /// Stable identifier derived from the file stem.
    pub fn id(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}

/// Audio container/codec written by [`MediaBackend::extract_audio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// 16 kHz mono PCM WAV, the native input of local speech models.
    Wav16kMono,
    /// MP3, compact enough for upload to hosted APIs.
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav16kMono => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }
}

/// Result of pulling the audio track out of a video.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioExtraction {
    /// Audio was written to this path.
    Extracted(PathBuf),
    /// The container has no audio stream.
    NoAudioTrack,
    /// An audio stream exists but could not be decoded; carries the decoder error.
    UnsupportedCodec(String),
}

/// Access to media containers.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Probe a container for duration and streams.
    ///
    /// Fails with `UnreadableVideo` when the file is missing or cannot be parsed.
    async fn probe(&self, path: &Path) -> Result<MediaInfo>;

    /// Decode one frame at `timestamp` seconds as JPEG bytes.
    ///
    /// Returns `None` when no frame could be decoded at that position.
    async fn extract_frame(&self, path: &Path, timestamp: f64) -> Result<Option<Vec<u8>>>;

    /// Write the first audio track of `path` to `dest` in the given format.
    async fn extract_audio(
        &self,
        path: &Path,
        dest: &Path,
        format: AudioFormat,
    ) -> Result<AudioExtraction>;
}
