//! Ingestion pipeline for vidlore.
//!
//! Runs probe, frame sampling, captioning, transcription and aggregation for each
//! video in turn. Per-file problems are reported and the run moves on; a speech
//! model that cannot be loaded stops transcription for the rest of the run while
//! frames keep flowing.

use crate::aggregate::{IngestDocument, IngestResult};
use crate::config::Settings;
use crate::error::{Result, VidloreError};
use crate::frames::{caption_frames, FrameCaptioner, FrameSampler, VisionCaptioner};
use crate::media::{discover_videos, FfmpegBackend, MediaBackend, VideoAsset};
use crate::transcription::{
    create_loader, AudioTranscriber, DecodeOptions, ModelStatus, SpeechModelHandle,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// A video that could not be ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of an ingestion run over one or more videos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub results: Vec<IngestResult>,
    pub failures: Vec<IngestFailure>,
    /// Set when the speech model could not be loaded during the run.
    pub model_failure: Option<String>,
}

impl RunReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            results: Vec::new(),
            failures: Vec::new(),
            model_failure: None,
        }
    }

    /// Aggregate every successful result.
    pub fn documents(&self, window_seconds: f64) -> Vec<IngestDocument> {
        self.results
            .iter()
            .map(|r| r.to_document(window_seconds))
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.model_failure.is_none()
    }
}

/// The main orchestrator for the vidlore pipeline.
pub struct Orchestrator {
    settings: Settings,
    media: Arc<dyn MediaBackend>,
    sampler: FrameSampler,
    transcriber: AudioTranscriber,
    captioner: Option<Arc<dyn FrameCaptioner>>,
}

impl Orchestrator {
    /// Create an orchestrator backed by ffmpeg and the configured providers.
    pub fn new(settings: Settings) -> Result<Self> {
        let media: Arc<dyn MediaBackend> = Arc::new(FfmpegBackend::new());

        let loader = create_loader(&settings);
        info!(
            "Using {} speech model provider ({})",
            settings.transcription.provider, settings.transcription.speech_model_size
        );
        let model = Arc::new(SpeechModelHandle::new(
            loader,
            &settings.transcription.speech_model_size,
        ));

        let captioner = VisionCaptioner::from_settings(&settings.captioning)?
            .map(|c| Arc::new(c) as Arc<dyn FrameCaptioner>);

        Self::with_components(settings, media, model, captioner)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        media: Arc<dyn MediaBackend>,
        model: Arc<SpeechModelHandle>,
        captioner: Option<Arc<dyn FrameCaptioner>>,
    ) -> Result<Self> {
        settings.validate()?;

        let sampler = FrameSampler::from_settings(Arc::clone(&media), &settings.video)?;
        let transcriber = AudioTranscriber::new(
            model,
            Arc::clone(&media),
            DecodeOptions::from(&settings.transcription),
            settings.temp_dir(),
        );

        Ok(Self {
            settings,
            media,
            sampler,
            transcriber,
            captioner,
        })
    }

    /// Drop the captioner; frames keep their timestamps but get no captions.
    pub fn without_captions(mut self) -> Self {
        self.captioner = None;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn model(&self) -> &Arc<SpeechModelHandle> {
        self.transcriber.model()
    }

    pub fn has_captioner(&self) -> bool {
        self.captioner.is_some()
    }

    pub async fn model_status(&self) -> ModelStatus {
        self.model().status().await
    }

    /// Run the full pipeline on one video.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_video(&self, path: &Path) -> Result<IngestResult> {
        info!("Processing video: {}", path.display());

        let info = self.media.probe(path).await?;
        let video = VideoAsset::new(path, &info);
        info!(
            "Video duration: {:.2}s, audio: {}",
            video.duration_seconds,
            video.audio_codec.as_deref().unwrap_or("none")
        );

        let samples = self.sampler.sample(path, &info).await?;
        let frames = caption_frames(self.captioner.as_deref(), samples).await;

        let transcript = match self.transcriber.transcribe(&video).await {
            Ok(outcome) => {
                info!("Transcript for {}: {}", video.name, outcome.describe());
                Some(outcome)
            }
            Err(e) if e.is_model_load() => {
                error!("Skipping transcription for {}: {}", video.name, e);
                None
            }
            Err(e) => return Err(e),
        };

        let result = IngestResult::new(video, frames, transcript);
        info!(
            "Processed {}: {} frames, {} captions, {} segments",
            result.video.name,
            result.frames.len(),
            result.frame_texts().len(),
            result.segment_count()
        );
        Ok(result)
    }

    /// Ingest the given videos one after the other.
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> RunReport {
        self.run(Uuid::new_v4(), paths).await
    }

    /// Ingest a single video file or every video under a folder.
    pub async fn ingest_input(&self, input: &Path) -> Result<RunReport> {
        let paths = if input.is_dir() {
            let videos = discover_videos(input)?;
            if videos.is_empty() {
                warn!("No video files found in {}", input.display());
            }
            videos
        } else {
            vec![input.to_path_buf()]
        };

        Ok(self.ingest_paths(&paths).await)
    }

    #[instrument(skip(self, paths), fields(run_id = %run_id, videos = paths.len()))]
    async fn run(&self, run_id: Uuid, paths: &[PathBuf]) -> RunReport {
        let mut report = RunReport::new(run_id);
        info!("Starting ingestion run over {} videos", paths.len());

        for path in paths {
            match self.ingest_video(path).await {
                Ok(result) => report.results.push(result),
                Err(e) => {
                    match &e {
                        VidloreError::UnreadableVideo { .. } => {
                            warn!("Skipping {}: {}", path.display(), e)
                        }
                        _ => error!("Failed to ingest {}: {}", path.display(), e),
                    }
                    report.failures.push(IngestFailure {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if let ModelStatus::Failed(reason) = self.model_status().await {
            report.model_failure = Some(reason);
        }

        info!(
            "Ingestion run complete: {} ingested, {} failed",
            report.results.len(),
            report.failures.len()
        );
        report
    }
}
