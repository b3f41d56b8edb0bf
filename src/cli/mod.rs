//! CLI module for vidlore.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// vidlore - video ingestion for retrieval-augmented generation
///
/// Samples frames, captions them with a vision model, transcribes the audio track
/// and aggregates both into documents ready for indexing.
#[derive(Parser, Debug)]
#[command(name = "vidlore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "VIDLORE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a video file, or every video under a folder
    Ingest {
        /// Video file or folder
        path: PathBuf,

        /// Write the run report and documents as JSON to this file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds between sampled frames
        #[arg(long)]
        interval: Option<f64>,

        /// Maximum number of frames per video
        #[arg(long)]
        max_frames: Option<usize>,

        /// Length of the time windows used for chunks, in seconds
        #[arg(long)]
        window: Option<f64>,

        /// Sample frames without captioning them
        #[arg(long)]
        no_captions: bool,
    },

    /// Sample frames from a video and write them as JPEG files
    Sample {
        /// Video file
        video: PathBuf,

        /// Directory for the extracted frames
        #[arg(short, long, default_value = "frames")]
        out_dir: PathBuf,

        /// Seconds between sampled frames
        #[arg(long)]
        interval: Option<f64>,

        /// Maximum number of frames
        #[arg(long)]
        max_frames: Option<usize>,
    },

    /// Transcribe the audio track of a video
    Transcribe {
        /// Video file
        video: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (json, srt, vtt)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
