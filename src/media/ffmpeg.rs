//! `ffprobe`/`ffmpeg` backed media access.

use super::{AudioExtraction, AudioFormat, MediaBackend, MediaInfo, StreamInfo};
use crate::error::{Result, VidloreError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Media backend that shells out to `ffprobe` and `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self::with_commands("ffmpeg", "ffprobe")
    }

    /// Use specific executables instead of the ones on `PATH`.
    pub fn with_commands(ffmpeg: &str, ffprobe: &str) -> Self {
        Self {
            ffmpeg: ffmpeg.to_string(),
            ffprobe: ffprobe.to_string(),
        }
    }

    fn spawn_error(&self, tool: &str, e: std::io::Error) -> VidloreError {
        if e.kind() == std::io::ErrorKind::NotFound {
            VidloreError::ToolNotFound(tool.to_string())
        } else {
            VidloreError::ToolFailed(format!("Failed to run {}: {}", tool, e))
        }
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        if !path.exists() {
            return Err(VidloreError::unreadable(path, "file not found"));
        }

        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(&self.ffprobe, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidloreError::unreadable(
                path,
                format!("ffprobe could not parse the container: {}", stderr.trim()),
            ));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            VidloreError::unreadable(path, format!("unexpected ffprobe output: {}", e))
        })?;

        let info = parse_probe_output(&json);
        if !info.has_video() {
            return Err(VidloreError::unreadable(path, "no video stream"));
        }

        debug!(
            "Probed {:.2}s, {} video / {} audio streams",
            info.duration_seconds,
            info.video_streams.len(),
            info.audio_streams.len()
        );
        Ok(info)
    }

    async fn extract_frame(&self, path: &Path, timestamp: f64) -> Result<Option<Vec<u8>>> {
        let output = Command::new(&self.ffmpeg)
            .arg("-ss").arg(format!("{:.3}", timestamp))
            .arg("-i").arg(path)
            .arg("-frames:v").arg("1")
            .arg("-f").arg("image2pipe")
            .arg("-c:v").arg("mjpeg")
            .arg("-loglevel").arg("error")
            .arg("pipe:1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(&self.ffmpeg, e))?;

        if !output.status.success() || output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("No frame decoded at {:.2}s: {}", timestamp, stderr.trim());
            return Ok(None);
        }

        Ok(Some(output.stdout))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn extract_audio(
        &self,
        path: &Path,
        dest: &Path,
        format: AudioFormat,
    ) -> Result<AudioExtraction> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-i").arg(path)
            .arg("-vn")
            .arg("-map").arg("0:a:0");

        match format {
            AudioFormat::Wav16kMono => {
                cmd.arg("-ac").arg("1")
                    .arg("-ar").arg("16000")
                    .arg("-c:a").arg("pcm_s16le");
            }
            AudioFormat::Mp3 => {
                cmd.arg("-codec:a").arg("libmp3lame")
                    .arg("-qscale:a").arg("2");
            }
        }

        let output = cmd
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(dest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(&self.ffmpeg, e))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Ok(classify_audio_failure(&stderr));
        }

        match std::fs::metadata(dest) {
            Ok(meta) if meta.len() > 0 => Ok(AudioExtraction::Extracted(dest.to_path_buf())),
            _ => Ok(AudioExtraction::UnsupportedCodec(format!(
                "ffmpeg produced no audio output{}",
                if stderr.is_empty() { String::new() } else { format!(": {}", stderr) }
            ))),
        }
    }
}

/// Map an `ffmpeg` failure while extracting audio to an extraction outcome.
fn classify_audio_failure(stderr: &str) -> AudioExtraction {
    let lowered = stderr.to_lowercase();
    if lowered.contains("matches no streams") || lowered.contains("does not contain any stream") {
        AudioExtraction::NoAudioTrack
    } else if stderr.is_empty() {
        AudioExtraction::UnsupportedCodec("ffmpeg exited with an error".to_string())
    } else {
        AudioExtraction::UnsupportedCodec(stderr.to_string())
    }
}

/// Build [`MediaInfo`] from `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_output(json: &serde_json::Value) -> MediaInfo {
    let mut info = MediaInfo {
        format_name: json["format"]["format_name"].as_str().map(str::to_string),
        ..MediaInfo::default()
    };

    let mut stream_duration: f64 = 0.0;

    if let Some(streams) = json["streams"].as_array() {
        for (position, stream) in streams.iter().enumerate() {
            let entry = StreamInfo {
                index: stream["index"].as_u64().unwrap_or(position as u64) as u32,
                codec_name: stream["codec_name"].as_str().map(str::to_string),
            };

            // Cover art is reported as a video stream; it has no timeline to sample.
            let attached_pic = stream["disposition"]["attached_pic"].as_i64() == Some(1);

            match stream["codec_type"].as_str() {
                Some("video") if !attached_pic => info.video_streams.push(entry),
                Some("audio") => info.audio_streams.push(entry),
                _ => {}
            }

            if let Some(d) = parse_seconds(&stream["duration"]) {
                stream_duration = stream_duration.max(d);
            }
        }
    }

    info.duration_seconds = parse_seconds(&json["format"]["duration"]).unwrap_or(stream_duration);
    info
}

fn parse_seconds(value: &serde_json::Value) -> Option<f64> {
    let seconds = match value {
        serde_json::Value::String(s) => s.parse::<f64>().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }?;
    (seconds.is_finite() && seconds >= 0.0).then_some(seconds)
}

/// Splits a long audio file into pieces of `chunk_seconds` for upload.
///
/// Returns tuples of (piece_path, offset_seconds). Audio no longer than one
/// piece is returned unchanged.
#[instrument(skip_all)]
pub async fn split_audio(
    backend: &FfmpegBackend,
    source: &Path,
    output_dir: &Path,
    chunk_seconds: u32,
) -> Result<Vec<(PathBuf, f64)>> {
    std::fs::create_dir_all(output_dir)?;

    let total_duration = probe_audio_duration(backend, source).await?;
    info!("Total audio duration: {:.1}s", total_duration);

    let chunk_len = chunk_seconds.max(1) as f64;

    if total_duration <= chunk_len {
        return Ok(vec![(source.to_path_buf(), 0.0)]);
    }

    let base_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    let mut pieces = Vec::new();
    let mut offset = 0.0;
    let mut idx = 0u32;

    while offset < total_duration {
        let piece_path = output_dir.join(format!("{}_{:04}.mp3", base_name, idx));
        let piece_len = chunk_len.min(total_duration - offset);

        extract_piece(backend, source, &piece_path, offset, piece_len).await?;

        debug!("Created audio piece {} at offset {:.1}s", idx, offset);
        pieces.push((piece_path, offset));

        offset += chunk_len;
        idx += 1;
    }

    info!("Created {} audio pieces", pieces.len());
    Ok(pieces)
}

async fn probe_audio_duration(backend: &FfmpegBackend, source: &Path) -> Result<f64> {
    let output = Command::new(&backend.ffprobe)
        .args(["-v", "error", "-show_entries", "format=duration", "-of", "csv=p=0"])
        .arg(source)
        .output()
        .await
        .map_err(|e| backend.spawn_error(&backend.ffprobe, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VidloreError::ToolFailed(format!("ffprobe failed: {}", stderr.trim())));
    }

    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse::<f64>()
        .map_err(|e| VidloreError::ToolFailed(format!("Unparseable audio duration: {}", e)))
}

async fn extract_piece(
    backend: &FfmpegBackend,
    source: &Path,
    dest: &Path,
    start: f64,
    length: f64,
) -> Result<()> {
    // Stream copy first; re-encode when the source cannot be cut at this point.
    let copy_result = Command::new(&backend.ffmpeg)
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("warning")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Ok(status) = copy_result {
        if status.success() && dest.exists() {
            return Ok(());
        }
    }

    warn!("Stream copy failed, re-encoding audio piece");

    let output = Command::new(&backend.ffmpeg)
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| backend.spawn_error(&backend.ffmpeg, e))?;

    if output.status.success() {
        Ok(())
    } else {
        let err = String::from_utf8_lossy(&output.stderr);
        Err(VidloreError::ToolFailed(format!("ffmpeg segment extraction failed: {}", err.trim())))
    }
}
