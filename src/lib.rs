//! vidlore - video ingestion for retrieval-augmented generation
//!
//! Turns video files into text a RAG indexer can embed: frames sampled at a fixed
//! interval are captioned by a vision model, the audio track is transcribed by a
//! speech model, and both are aggregated into one document with time-windowed chunks.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `media` - Probing and decoding through ffmpeg
//! - `frames` - Frame sampling and captioning
//! - `transcription` - Speech-to-text with a lazily loaded, shared model
//! - `aggregate` - Documents and chunks for the indexer
//! - `orchestrator` - Pipeline coordination over files and folders
//!
//! # Example
//!
//! ```rust,no_run
//! use vidlore::config::Settings;
//! use vidlore::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let window = settings.chunking.window_seconds;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator.ingest_input("talks/".as_ref()).await?;
//!     for doc in report.documents(window) {
//!         println!("{}: {} chunks", doc.source, doc.chunks.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod frames;
pub mod media;
pub mod openai;
pub mod orchestrator;
pub mod transcription;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Result, VidloreError};
