//! Error types for vidlore.

use std::path::PathBuf;
use thiserror::Error;

/// Library-level error type for ingestion operations.
#[derive(Error, Debug)]
pub enum VidloreError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The file is missing, its container is corrupt or unsupported, or it has no video stream.
    #[error("Unreadable video {path}: {reason}")]
    UnreadableVideo { path: PathBuf, reason: String },

    /// The speech-to-text model could not be initialized.
    #[error("Speech model failed to load: {0}")]
    ModelLoad(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Frame captioning failed: {0}")]
    Captioning(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl VidloreError {
    /// Shorthand for an [`VidloreError::UnreadableVideo`] error.
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnreadableVideo {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error must stop all further transcription in a run.
    pub fn is_model_load(&self) -> bool {
        matches!(self, Self::ModelLoad(_))
    }
}

/// Result type alias for vidlore operations.
pub type Result<T> = std::result::Result<T, VidloreError>;
