//! Configuration settings for vidlore.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub video: VideoSettings,
    pub transcription: TranscriptionSettings,
    pub captioning: CaptioningSettings,
    pub chunking: ChunkingSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for temporary files (extracted audio, model output).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/vidlore".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Frame sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// Seconds between sampled frames.
    pub frame_interval_seconds: f64,
    /// Maximum number of frames sampled per video.
    pub max_frames: usize,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            frame_interval_seconds: 5.0,
            max_frames: 50,
        }
    }
}

/// Speech-to-text provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    /// Local Whisper runtime (default).
    #[default]
    Local,
    /// Hosted OpenAI Whisper API.
    OpenAI,
}

impl std::str::FromStr for SpeechProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "whisper" => Ok(SpeechProvider::Local),
            "openai" | "hosted" => Ok(SpeechProvider::OpenAI),
            _ => Err(format!("Unknown speech provider: {}", s)),
        }
    }
}

impl std::fmt::Display for SpeechProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechProvider::Local => write!(f, "local"),
            SpeechProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Speech model provider (local, openai).
    pub provider: SpeechProvider,
    /// Model size for the local runtime (tiny, base, small, medium, large, turbo).
    pub speech_model_size: String,
    /// Disable half-precision decoding for platforms without the needed acceleration.
    pub precision_compatibility_mode: bool,
    /// Request word-level timestamp alignment.
    pub word_timestamps: bool,
    /// Stream per-segment progress from the model into the log.
    pub verbose: bool,
    /// Language hint (auto-detected when unset).
    pub language: Option<String>,
    /// Directory holding local model weights.
    pub model_dir: Option<String>,
    /// Refuse to load a local model whose weights are not already in `model_dir`.
    pub offline: bool,
    /// Command used to invoke the local Whisper runtime.
    pub whisper_command: String,
    /// Model name for the hosted provider.
    pub hosted_model: String,
    /// Audio piece length for the hosted provider, in seconds.
    pub chunk_duration_seconds: u32,
    /// Hosted pieces uploaded at the same time.
    pub max_concurrent_pieces: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            provider: SpeechProvider::Local,
            speech_model_size: "base".to_string(),
            precision_compatibility_mode: true,
            word_timestamps: false,
            verbose: true,
            language: None,
            model_dir: None,
            offline: false,
            whisper_command: "whisper".to_string(),
            hosted_model: "whisper-1".to_string(),
            chunk_duration_seconds: 600,
            max_concurrent_pieces: 3,
        }
    }
}

/// Vision captioning settings for sampled frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptioningSettings {
    /// Caption sampled frames at all.
    pub enabled: bool,
    /// Base URL of the OpenAI-compatible chat completion API.
    pub api_base: String,
    /// Vision model name.
    pub model: String,
    /// Environment variable holding the API token.
    pub api_key_env: String,
    /// Maximum tokens per caption.
    pub max_tokens: u32,
    /// Instruction sent alongside each frame.
    pub prompt: String,
}

impl Default for CaptioningSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://router.huggingface.co/v1".to_string(),
            model: "Qwen/Qwen2.5-VL-7B-Instruct:hyperbolic".to_string(),
            api_key_env: "HF_TOKEN".to_string(),
            max_tokens: 300,
            prompt: "Describe what is shown in this video frame. Focus on key visual elements, \
                     actions, text, or important information."
                .to_string(),
        }
    }
}

impl CaptioningSettings {
    /// The API token, if the configured environment variable is set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Settings for time-windowed chunks handed to the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Window length in seconds.
    pub window_seconds: f64,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            window_seconds: 30.0,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::VidloreError;

        if !(self.video.frame_interval_seconds > 0.0) {
            return Err(VidloreError::Config(format!(
                "video.frame_interval_seconds must be positive, got {}",
                self.video.frame_interval_seconds
            )));
        }
        if self.video.max_frames == 0 {
            return Err(VidloreError::Config(
                "video.max_frames must be at least 1".to_string(),
            ));
        }
        if !(self.chunking.window_seconds > 0.0) {
            return Err(VidloreError::Config(format!(
                "chunking.window_seconds must be positive, got {}",
                self.chunking.window_seconds
            )));
        }
        if self.transcription.max_concurrent_pieces == 0 {
            return Err(VidloreError::Config(
                "transcription.max_concurrent_pieces must be at least 1".to_string(),
            ));
        }
        if self.transcription.speech_model_size.trim().is_empty() {
            return Err(VidloreError::Config(
                "transcription.speech_model_size must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::VidloreError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidlore")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded local model directory, if configured.
    pub fn model_dir(&self) -> Option<PathBuf> {
        self.transcription
            .model_dir
            .as_deref()
            .map(Self::expand_path)
    }
}
