//! Frame sampling and captioning.
//!
//! Frames are taken uniformly from the start of the timeline at a fixed interval
//! (`0, I, 2I, ...`) until either the duration or the frame budget runs out.

mod caption;

pub use caption::{caption_frames, CaptionedFrame, FrameCaptioner, VisionCaptioner};

use crate::config::VideoSettings;
use crate::error::{Result, VidloreError};
use crate::media::{MediaBackend, MediaInfo};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Tolerance for float error when dividing the duration by the interval.
const PLAN_EPSILON: f64 = 1e-9;

/// How far before the container end a frame at the very end is decoded from.
/// The last frame's pts sits slightly before the reported duration.
const END_SEEK_BACKOFF: f64 = 0.1;

/// One decoded still image.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSample {
    /// Position in the video, in seconds.
    pub timestamp: f64,
    /// JPEG-encoded image bytes.
    pub image: Vec<u8>,
}

/// Timestamps to sample for a video of `duration_seconds`.
///
/// Yields `min(floor(D / I) + 1, max_frames)` timestamps at multiples of the interval.
/// A zero, negative or non-finite duration yields a single frame at 0.
pub fn plan_timestamps(duration_seconds: f64, interval_seconds: f64, max_frames: usize) -> Vec<f64> {
    if max_frames == 0 {
        return Vec::new();
    }
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return vec![0.0];
    }

    let steps = (duration_seconds / interval_seconds + PLAN_EPSILON).floor();
    let count = if steps.is_finite() && steps < max_frames as f64 {
        steps as usize + 1
    } else {
        max_frames
    };

    (0..count)
        .map(|i| i as f64 * interval_seconds)
        .map(|t| t.min(duration_seconds))
        .collect()
}

/// Position to seek to when decoding the frame planned at `timestamp`.
///
/// Seeking to the container duration lands past the last decodable frame, so
/// timestamps within [`END_SEEK_BACKOFF`] of the end are pulled back from it.
/// The frame keeps its planned timestamp.
pub fn seek_position(timestamp: f64, duration_seconds: f64) -> f64 {
    if !duration_seconds.is_finite() || timestamp < duration_seconds - END_SEEK_BACKOFF {
        return timestamp;
    }
    (duration_seconds - END_SEEK_BACKOFF).max(0.0).min(timestamp)
}

/// Extracts frames at planned timestamps through a [`MediaBackend`].
pub struct FrameSampler {
    media: Arc<dyn MediaBackend>,
    interval_seconds: f64,
    max_frames: usize,
}

impl FrameSampler {
    /// Create a sampler; the interval must be positive.
    pub fn new(media: Arc<dyn MediaBackend>, interval_seconds: f64, max_frames: usize) -> Result<Self> {
        if !(interval_seconds.is_finite() && interval_seconds > 0.0) {
            return Err(VidloreError::InvalidInput(format!(
                "frame interval must be a positive number of seconds, got {}",
                interval_seconds
            )));
        }

        Ok(Self {
            media,
            interval_seconds,
            max_frames,
        })
    }

    pub fn from_settings(media: Arc<dyn MediaBackend>, settings: &VideoSettings) -> Result<Self> {
        Self::new(media, settings.frame_interval_seconds, settings.max_frames)
    }

    pub fn interval_seconds(&self) -> f64 {
        self.interval_seconds
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn plan(&self, duration_seconds: f64) -> Vec<f64> {
        plan_timestamps(duration_seconds, self.interval_seconds, self.max_frames)
    }

    /// Decode frames for an already-probed video.
    ///
    /// Stops at the first timestamp that cannot be decoded and keeps what it has.
    #[instrument(skip(self, info), fields(path = %path.display()))]
    pub async fn sample(&self, path: &Path, info: &MediaInfo) -> Result<Vec<FrameSample>> {
        let timestamps = self.plan(info.duration_seconds);
        info!(
            "Sampling {} frames every {}s from {:.2}s of video",
            timestamps.len(),
            self.interval_seconds,
            info.duration_seconds
        );

        let mut frames = Vec::with_capacity(timestamps.len());
        for timestamp in timestamps {
            let seek = seek_position(timestamp, info.duration_seconds);
            match self.media.extract_frame(path, seek).await? {
                Some(image) => {
                    debug!("Frame at {:.1}s: {} bytes", timestamp, image.len());
                    frames.push(FrameSample { timestamp, image });
                }
                None => {
                    warn!(
                        "Could not decode frame at {:.1}s, stopping after {} frames",
                        timestamp,
                        frames.len()
                    );
                    break;
                }
            }
        }

        info!("Extracted {} frames", frames.len());
        Ok(frames)
    }

    /// Probe and sample a video.
    pub async fn sample_path(&self, path: &Path) -> Result<Vec<FrameSample>> {
        let info = self.media.probe(path).await?;
        self.sample(path, &info).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{AudioBehavior, FakeMedia};

    #[test]
    fn test_ten_minute_video_is_capped() {
        let ts = plan_timestamps(600.0, 5.0, 50);
        assert_eq!(ts.len(), 50);
        assert_eq!(ts[0], 0.0);
        assert_eq!(ts[49], 245.0);
    }

    #[test]
    fn test_thirty_seconds_includes_end() {
        let ts = plan_timestamps(30.0, 5.0, 50);
        assert_eq!(ts, vec![0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0]);
    }

    #[test]
    fn test_short_clip_counts() {
        assert_eq!(plan_timestamps(9.96, 5.0, 50), vec![0.0, 5.0]);
        assert_eq!(plan_timestamps(10.0, 5.0, 50).len(), 3);
        assert_eq!(plan_timestamps(4.99, 5.0, 50), vec![0.0]);
    }

    #[test]
    fn test_zero_or_unknown_duration_yields_one_frame() {
        assert_eq!(plan_timestamps(0.0, 5.0, 50), vec![0.0]);
        assert_eq!(plan_timestamps(f64::NAN, 5.0, 50), vec![0.0]);
        assert_eq!(plan_timestamps(-3.0, 5.0, 50), vec![0.0]);
    }

    #[test]
    fn test_plan_properties() {
        for &(duration, interval, max) in &[
            (0.4, 0.5, 10),
            (17.3, 2.5, 4),
            (3600.0, 5.0, 50),
            (59.999, 1.0, 100),
            (1.0, 0.1, 50),
        ] {
            let ts = plan_timestamps(duration, interval, max);
            let expected = ((duration / interval + PLAN_EPSILON).floor() as usize + 1).min(max);
            assert_eq!(ts.len(), expected, "D={} I={} M={}", duration, interval, max);
            assert!(ts.windows(2).all(|w| w[0] < w[1]));
            assert!(ts.iter().all(|&t| t >= 0.0 && t <= duration));
            assert_eq!(ts, plan_timestamps(duration, interval, max));
        }
    }

    #[test]
    fn test_seek_position_backs_off_from_end() {
        assert!((seek_position(30.0, 30.0) - 29.9).abs() < 1e-9);
        assert!((seek_position(29.95, 30.0) - 29.9).abs() < 1e-9);
        assert_eq!(seek_position(25.0, 30.0), 25.0);
        assert_eq!(seek_position(0.0, 30.0), 0.0);
        assert_eq!(seek_position(0.0, 0.05), 0.0);
        assert_eq!(seek_position(0.0, 0.0), 0.0);
        assert_eq!(seek_position(0.0, f64::NAN), 0.0);
    }

    #[tokio::test]
    async fn test_final_frame_at_duration_is_decoded() {
        // Last decodable frame of a 30 s clip at ~30 fps.
        let media = Arc::new(
            FakeMedia::new()
                .with_video("/v/clip.mp4", 30.0, true, AudioBehavior::Extract)
                .with_decodable_until("/v/clip.mp4", 29.97),
        );
        let sampler = FrameSampler::new(media.clone(), 5.0, 50).unwrap();

        let frames = sampler.sample_path(Path::new("/v/clip.mp4")).await.unwrap();
        let ts: Vec<f64> = frames.iter().map(|f| f.timestamp).collect();
        assert_eq!(ts, vec![0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0]);
        assert_eq!(media.frame_calls(), 7);
    }

    #[test]
    fn test_rejects_non_positive_interval() {
        let media = Arc::new(FakeMedia::new());
        assert!(FrameSampler::new(media.clone(), 0.0, 50).is_err());
        assert!(FrameSampler::new(media, -1.0, 50).is_err());
    }

    #[tokio::test]
    async fn test_sample_extracts_planned_frames() {
        let media = Arc::new(FakeMedia::new().with_video("/v/talk.mp4", 30.0, true, AudioBehavior::Extract));
        let sampler = FrameSampler::new(media.clone(), 5.0, 50).unwrap();

        let frames = sampler.sample_path(Path::new("/v/talk.mp4")).await.unwrap();
        assert_eq!(frames.len(), 7);
        assert_eq!(frames.last().unwrap().timestamp, 30.0);
        assert!(frames.iter().all(|f| f.image.starts_with(&[0xFF, 0xD8])));
        assert_eq!(media.frame_calls(), 7);
    }

    #[tokio::test]
    async fn test_decode_failure_keeps_earlier_frames() {
        let media = Arc::new(
            FakeMedia::new()
                .with_video("/v/broken.mkv", 60.0, false, AudioBehavior::NoTrack)
                .with_decodable_until("/v/broken.mkv", 12.0),
        );
        let sampler = FrameSampler::new(media.clone(), 5.0, 50).unwrap();

        let frames = sampler.sample_path(Path::new("/v/broken.mkv")).await.unwrap();
        let ts: Vec<f64> = frames.iter().map(|f| f.timestamp).collect();
        assert_eq!(ts, vec![0.0, 5.0, 10.0]);
        assert_eq!(media.frame_calls(), 4);
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let sampler = FrameSampler::new(Arc::new(FakeMedia::new()), 5.0, 50).unwrap();
        let err = sampler.sample_path(Path::new("/v/missing.mp4")).await.unwrap_err();
        assert!(matches!(err, VidloreError::UnreadableVideo { .. }));
    }
}
