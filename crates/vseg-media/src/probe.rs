//! FFprobe audio stream information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::{check_ffprobe, stderr_tail};
use crate::error::{MediaError, MediaResult};

/// First audio stream of a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
    /// Duration in seconds (0 when unknown)
    pub duration: f64,
    /// Audio codec
    pub codec: String,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
    duration: Option<String>,
}

/// Probe a media file for its first audio stream.
pub async fn probe_audio(path: impl AsRef<Path>) -> MediaResult<AudioStreamInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::unreadable(path, "file not found"));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(stderr_tail(&output.stderr)),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    parse_audio_stream(probe)
}

fn parse_audio_stream(probe: FfprobeOutput) -> MediaResult<AudioStreamInfo> {
    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .ok_or_else(|| MediaError::unsupported("No audio stream found"))?;

    let sample_rate = stream
        .sample_rate
        .as_ref()
        .and_then(|r| r.parse::<u32>().ok())
        .filter(|r| *r > 0)
        .ok_or_else(|| MediaError::unsupported("Audio stream has no sample rate"))?;

    // Prefer the stream duration, fall back to the container's
    let duration = stream
        .duration
        .as_ref()
        .or(probe.format.as_ref().and_then(|f| f.duration.as_ref()))
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(AudioStreamInfo {
        sample_rate,
        channels: stream.channels.unwrap_or(1).max(1),
        duration,
        codec: stream.codec_name.clone().unwrap_or_default(),
    })
}
