//! Worker error types.

use thiserror::Error;
use vseg_models::ErrorKind;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Job timed out after {0} seconds")]
    Timeout(u64),

    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] vseg_media::MediaError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    /// Check if error is retryable.
    ///
    /// Segmentation itself is deterministic; only timeouts and IO hiccups
    /// are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkerError::Timeout(_) | WorkerError::Io(_))
    }

    /// Category reported when this error becomes a job result.
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            WorkerError::Media(e) => e.kind(),
            _ => ErrorKind::InternalProcessingError,
        }
    }
}
