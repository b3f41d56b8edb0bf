//! Sample command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::frames::{FrameSample, FrameSampler};
use crate::media::FfmpegBackend;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Run the sample command: write the planned frames of a video as JPEG files.
pub async fn run_sample(
    video: &Path,
    out_dir: &Path,
    interval: Option<f64>,
    max_frames: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Sample, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'vidlore doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(interval) = interval {
        settings.video.frame_interval_seconds = interval;
    }
    if let Some(max_frames) = max_frames {
        settings.video.max_frames = max_frames;
    }
    settings.validate()?;

    let sampler = FrameSampler::from_settings(Arc::new(FfmpegBackend::new()), &settings.video)?;

    let spinner = Output::spinner(&format!("Sampling {}...", video.display()));
    let frames = sampler.sample_path(video).await;
    spinner.finish_and_clear();
    let frames = frames?;

    tokio::fs::create_dir_all(out_dir).await?;
    let stem = video
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");

    for (index, frame) in frames.iter().enumerate() {
        let path = frame_path(out_dir, stem, index, frame);
        tokio::fs::write(&path, &frame.image).await?;
        Output::kv(&format!("{:.1}s", frame.timestamp), &path.display().to_string());
    }

    Output::success(&format!(
        "Wrote {} frame(s) to {}",
        frames.len(),
        out_dir.display()
    ));
    Ok(())
}

fn frame_path(out_dir: &Path, stem: &str, index: usize, frame: &FrameSample) -> PathBuf {
    out_dir.join(format!("{}_{:04}_{:.1}s.jpg", stem, index, frame.timestamp))
}
