//! Configuration module for vidlore.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    CaptioningSettings, ChunkingSettings, GeneralSettings, Settings, SpeechProvider,
    TranscriptionSettings, VideoSettings,
};
