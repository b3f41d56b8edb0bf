//! Local Whisper runtime.
//!
//! Runs the `whisper` command-line program against extracted audio and reads
//! back its JSON output. The runtime prints one line per decoded segment in
//! verbose mode; those lines are forwarded to the log as they arrive.

use super::{DecodeOptions, SpeechModel, SpeechModelLoader, SpeechOutput, TranscriptSegment};
use crate::config::Settings;
use crate::error::{Result, VidloreError};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Model sizes the Whisper runtime knows how to fetch.
pub const KNOWN_MODEL_SIZES: &[&str] = &[
    "tiny", "tiny.en", "base", "base.en", "small", "small.en", "medium", "medium.en",
    "large", "large-v1", "large-v2", "large-v3", "large-v3-turbo", "turbo",
];

/// Loads a [`LocalWhisperModel`] after checking that the runtime can start.
pub struct LocalWhisperLoader {
    command: String,
    model_dir: Option<PathBuf>,
    offline: bool,
    work_dir: PathBuf,
}

impl LocalWhisperLoader {
    pub fn new(command: &str, work_dir: PathBuf) -> Self {
        Self {
            command: command.to_string(),
            model_dir: None,
            offline: false,
            work_dir,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            command: settings.transcription.whisper_command.clone(),
            model_dir: settings.model_dir(),
            offline: settings.transcription.offline,
            work_dir: settings.temp_dir().join("whisper"),
        }
    }

    /// Require weights to be present in `model_dir` instead of downloading them.
    pub fn with_model_dir(mut self, model_dir: PathBuf, offline: bool) -> Self {
        self.model_dir = Some(model_dir);
        self.offline = offline;
        self
    }

    fn check_weights(&self, model_size: &str) -> Result<()> {
        if !self.offline {
            return Ok(());
        }

        let dir = self.model_dir.as_ref().ok_or_else(|| {
            VidloreError::ModelLoad(
                "offline mode requires transcription.model_dir to be set".to_string(),
            )
        })?;

        let weights = dir.join(format!("{}.pt", model_size));
        if weights.is_file() {
            Ok(())
        } else {
            Err(VidloreError::ModelLoad(format!(
                "model weights not found at {}",
                weights.display()
            )))
        }
    }

    async fn check_runtime(&self) -> Result<()> {
        let output = Command::new(&self.command)
            .arg("--help")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VidloreError::ModelLoad(format!(
                        "speech runtime '{}' not found; install it with: pip install openai-whisper",
                        self.command
                    ))
                } else {
                    VidloreError::ModelLoad(format!("failed to start '{}': {}", self.command, e))
                }
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(VidloreError::ModelLoad(format!(
                "speech runtime '{}' is installed but not working: {}",
                self.command,
                last_lines(&stderr, 5)
            )))
        }
    }
}

#[async_trait]
impl SpeechModelLoader for LocalWhisperLoader {
    async fn load(&self, model_size: &str) -> Result<Arc<dyn SpeechModel>> {
        if !KNOWN_MODEL_SIZES.contains(&model_size) {
            return Err(VidloreError::ModelLoad(format!(
                "unknown model size '{}'; expected one of: {}",
                model_size,
                KNOWN_MODEL_SIZES.join(", ")
            )));
        }

        self.check_weights(model_size)?;
        self.check_runtime().await?;

        Ok(Arc::new(LocalWhisperModel {
            name: format!("whisper {}", model_size),
            command: self.command.clone(),
            model_size: model_size.to_string(),
            model_dir: self.model_dir.clone(),
            work_dir: self.work_dir.clone(),
        }))
    }
}

/// A Whisper model run through the local runtime.
#[derive(Debug)]
pub struct LocalWhisperModel {
    name: String,
    command: String,
    model_size: String,
    model_dir: Option<PathBuf>,
    work_dir: PathBuf,
}

impl LocalWhisperModel {
    /// Command-line arguments for one transcription.
    fn build_args(&self, audio_path: &Path, output_dir: &Path, options: &DecodeOptions) -> Vec<OsString> {
        let flag = |value: bool| if value { "True" } else { "False" };

        let mut args: Vec<OsString> = vec![
            audio_path.as_os_str().to_os_string(),
            "--model".into(),
            self.model_size.clone().into(),
            "--task".into(),
            "transcribe".into(),
            "--output_format".into(),
            "json".into(),
            "--output_dir".into(),
            output_dir.as_os_str().to_os_string(),
            "--verbose".into(),
            flag(options.verbose).into(),
            "--fp16".into(),
            flag(options.fp16).into(),
            "--word_timestamps".into(),
            flag(options.word_timestamps).into(),
        ];

        if let Some(dir) = &self.model_dir {
            args.push("--model_dir".into());
            args.push(dir.as_os_str().to_os_string());
        }

        if let Some(language) = &options.language {
            args.push("--language".into());
            args.push(language.clone().into());
        }

        args
    }
}

#[async_trait]
impl SpeechModel for LocalWhisperModel {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, options), fields(audio_path = %audio_path.display(), model = %self.model_size))]
    async fn transcribe(&self, audio_path: &Path, options: &DecodeOptions) -> Result<SpeechOutput> {
        std::fs::create_dir_all(&self.work_dir)?;
        let output_dir = tempfile::Builder::new()
            .prefix("whisper-")
            .tempdir_in(&self.work_dir)?;

        let mut child = Command::new(&self.command)
            .args(self.build_args(audio_path, output_dir.path(), options))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VidloreError::Transcription(format!("failed to start {}: {}", self.command, e)))?;

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        });

        let mut segment_lines = 0usize;
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                if is_segment_progress(&line) {
                    segment_lines += 1;
                    info!("[segment {}] {}", segment_lines, line.trim());
                } else if !line.trim().is_empty() {
                    debug!("whisper: {}", line.trim());
                }
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(VidloreError::Transcription(format!(
                "{} exited with {}: {}",
                self.command,
                status,
                last_lines(&stderr, 10)
            )));
        }

        let stem = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let json_path = output_dir.path().join(format!("{}.json", stem));

        let content = std::fs::read_to_string(&json_path).map_err(|e| {
            VidloreError::Transcription(format!(
                "missing model output {}: {}",
                json_path.display(),
                e
            ))
        })?;

        parse_whisper_json(&content)
    }
}

#[derive(Deserialize)]
struct WhisperJson {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<WhisperJsonSegment>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Deserialize)]
struct WhisperJsonSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
}

/// Parse the JSON document written by `whisper --output_format json`.
pub fn parse_whisper_json(content: &str) -> Result<SpeechOutput> {
    let parsed: WhisperJson = serde_json::from_str(content)
        .map_err(|e| VidloreError::Transcription(format!("unreadable model output: {}", e)))?;

    let segments = parsed
        .segments
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .map(|s| TranscriptSegment::new(s.start, s.end, s.text.trim().to_string()))
        .collect();

    Ok(SpeechOutput {
        segments,
        text: parsed.text.trim().to_string(),
        language: parsed.language.filter(|l| !l.is_empty()),
    })
}

fn is_segment_progress(line: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^\s*\[(\d+:)?\d+:\d+\.\d+ --> (\d+:)?\d+:\d+\.\d+\]")
                .expect("static regex is valid")
        })
        .is_match(line)
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
