//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{Settings, SpeechProvider};
use crate::error::{Result, VidloreError};
use crate::transcription::is_api_key_configured;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Full ingestion needs the media tools; the speech runtime is optional.
    Ingest,
    /// Frame sampling needs only the media tools.
    Sample,
    /// Transcription needs the media tools and a usable speech provider.
    Transcribe,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_tool("ffmpeg")?;
    check_tool("ffprobe")?;

    if operation == Operation::Transcribe {
        check_speech_provider(settings)?;
    }
    Ok(())
}

/// Check that the configured speech provider can be reached.
pub fn check_speech_provider(settings: &Settings) -> Result<()> {
    match settings.transcription.provider {
        SpeechProvider::Local => check_tool(&settings.transcription.whisper_command),
        SpeechProvider::OpenAI if is_api_key_configured() => Ok(()),
        SpeechProvider::OpenAI => Err(VidloreError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), whisper only knows --help
    let probe_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--help",
    };
    match Command::new(name).arg(probe_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(VidloreError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(VidloreError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(VidloreError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
