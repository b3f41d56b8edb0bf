//! Ingest command implementation.

use crate::aggregate::IngestDocument;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, RunReport};
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Knobs from the command line that override the config file.
#[derive(Debug, Default, Clone)]
pub struct IngestOverrides {
    pub interval: Option<f64>,
    pub max_frames: Option<usize>,
    pub window: Option<f64>,
    pub no_captions: bool,
}

impl IngestOverrides {
    fn apply(&self, settings: &mut Settings) {
        if let Some(interval) = self.interval {
            settings.video.frame_interval_seconds = interval;
        }
        if let Some(max_frames) = self.max_frames {
            settings.video.max_frames = max_frames;
        }
        if let Some(window) = self.window {
            settings.chunking.window_seconds = window;
        }
        if self.no_captions {
            settings.captioning.enabled = false;
        }
    }
}

/// JSON written by `vidlore ingest`.
#[derive(Serialize)]
struct IngestExport<'a> {
    #[serde(flatten)]
    report: &'a RunReport,
    documents: Vec<IngestDocument>,
}

/// Run the ingest command.
pub async fn run_ingest(
    path: &Path,
    output: Option<PathBuf>,
    overrides: IngestOverrides,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'vidlore doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    if let Err(e) = preflight::check_speech_provider(&settings) {
        Output::warning(&format!("Speech model may not load: {}", e));
        Output::info("Frames will still be sampled and captioned.");
    }

    overrides.apply(&mut settings);
    settings.validate()?;
    let window_seconds = settings.chunking.window_seconds;

    let orchestrator = Orchestrator::new(settings)?;
    if !overrides.no_captions && !orchestrator.has_captioner() {
        Output::warning("No vision model configured; frames will have no captions.");
    }

    let spinner = Output::spinner(&format!("Ingesting {}...", path.display()));
    let report = orchestrator.ingest_input(path).await?;
    spinner.finish_and_clear();

    Output::header(&format!("Run {}", report.run_id));
    for result in &report.results {
        Output::ingest_summary(result);
    }
    for failure in &report.failures {
        Output::warning(&format!("Skipped {}: {}", failure.path.display(), failure.reason));
    }
    if let Some(reason) = &report.model_failure {
        Output::error(&format!("Speech model unavailable, transcripts were skipped: {}", reason));
    }

    let export = IngestExport {
        report: &report,
        documents: report.documents(window_seconds),
    };
    let json = serde_json::to_string_pretty(&export)?;

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)?;
            Output::success(&format!(
                "Ingested {} video(s); report written to {}",
                report.results.len(),
                output_path.display()
            ));
        }
        None => println!("{}", json),
    }

    if report.results.is_empty() && !report.failures.is_empty() {
        anyhow::bail!("No videos could be ingested");
    }
    Ok(())
}
