//! Error types for loading and segmenting audio.

use std::path::PathBuf;
use thiserror::Error;
use vseg_models::ErrorKind;

use crate::activity::vad::VadError;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during segmentation.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Cannot read audio file {path}: {reason}")]
    UnreadableFile { path: PathBuf, reason: String },

    #[error("Audio signal is empty")]
    EmptySignal,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("No usable pauses found in the signal")]
    NoUsablePauses,

    #[error(
        "No valid segments: signal lasts {duration:.2}s, minimum segment length is {min_length:.2}s"
    )]
    NoValidSegments { duration: f64, min_length: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Segmentation was cancelled")]
    Cancelled,

    #[error("VAD error: {0}")]
    Vad(#[from] VadError),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an unreadable file error.
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::UnreadableFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported format error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat(message.into())
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Failure category reported in `SegmentationResult`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::UnreadableFile { .. } => ErrorKind::UnreadableFile,
            MediaError::EmptySignal => ErrorKind::EmptySignal,
            MediaError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            MediaError::NoUsablePauses => ErrorKind::NoUsablePauses,
            MediaError::NoValidSegments { .. } => ErrorKind::NoValidSegments,
            MediaError::InvalidConfig(_)
            | MediaError::FfmpegNotFound
            | MediaError::FfprobeNotFound
            | MediaError::FfmpegFailed { .. }
            | MediaError::FfprobeFailed { .. }
            | MediaError::Timeout(_)
            | MediaError::Cancelled
            | MediaError::Vad(_)
            | MediaError::Wav(_)
            | MediaError::Io(_)
            | MediaError::JsonParse(_)
            | MediaError::Internal(_) => ErrorKind::InternalProcessingError,
        }
    }
}
