//! CLI command implementations.

mod config;
mod doctor;
mod ingest;
mod sample;
mod transcribe;

pub use config::run_config;
pub use doctor::run_doctor;
pub use ingest::{run_ingest, IngestOverrides};
pub use sample::run_sample;
pub use transcribe::run_transcribe;
