//! Transcribe command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::media::{FfmpegBackend, MediaBackend, VideoAsset};
use crate::transcription::{
    create_loader, format_outcome, AudioTranscriber, DecodeOptions, OutputFormat,
    SpeechModelHandle, TranscriptOutcome,
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Run the transcribe command.
pub async fn run_transcribe(
    video: &Path,
    output: Option<PathBuf>,
    format: &str,
    settings: Settings,
) -> Result<()> {
    let format: OutputFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    if let Err(e) = preflight::check(Operation::Transcribe, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'vidlore doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let media: Arc<dyn MediaBackend> = Arc::new(FfmpegBackend::new());
    let model = Arc::new(SpeechModelHandle::new(
        create_loader(&settings),
        &settings.transcription.speech_model_size,
    ));
    let transcriber = AudioTranscriber::new(
        model,
        Arc::clone(&media),
        DecodeOptions::from(&settings.transcription),
        settings.temp_dir(),
    );

    let info = media.probe(video).await?;
    let asset = VideoAsset::new(video, &info);

    let spinner = Output::spinner(&format!("Transcribing {}...", asset.name));
    let outcome = transcriber.transcribe(&asset).await;
    spinner.finish_and_clear();
    let outcome = outcome?;

    let rendered = format_outcome(&outcome, format);
    match output {
        Some(path) => {
            std::fs::write(&path, rendered)?;
            Output::success(&format!("Transcript written to {}", path.display()));
        }
        None => println!("{}", rendered),
    }

    match &outcome {
        TranscriptOutcome::Transcribed(transcript) => Output::info(&format!(
            "{} ({} characters, language: {})",
            outcome.describe(),
            transcript.char_len(),
            transcript.language.as_deref().unwrap_or("unknown")
        )),
        TranscriptOutcome::Empty(_) => Output::warning(&outcome.describe()),
        TranscriptOutcome::Failed(_) => {
            Output::error(&outcome.describe());
            anyhow::bail!("Transcription failed for {}", asset.name);
        }
    }

    Ok(())
}
