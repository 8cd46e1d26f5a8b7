//! Job definitions for the segmentation worker.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::SegmentationConfig;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job to segment one recording into a directory of WAV files.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SegmentAudioJob {
    /// Unique job ID
    pub job_id: JobId,

    /// Source recording
    pub input_path: PathBuf,

    /// Directory receiving the numbered segments
    pub output_dir: PathBuf,

    /// Segmentation parameters
    #[serde(default)]
    pub config: SegmentationConfig,

    /// Job creation time
    pub created_at: DateTime<Utc>,
}

impl SegmentAudioJob {
    /// Create a new job with default configuration.
    pub fn new(input_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            job_id: JobId::new(),
            input_path: input_path.into(),
            output_dir: output_dir.into(),
            config: SegmentationConfig::default(),
            created_at: Utc::now(),
        }
    }

    /// Set the segmentation configuration.
    pub fn with_config(mut self, config: SegmentationConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a caller-supplied job ID.
    pub fn with_job_id(mut self, job_id: JobId) -> Self {
        self.job_id = job_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_generation() {
        let a = JobId::new();
        let b = JobId::new();
        assert_ne!(a, b);
        assert_eq!(JobId::from_string("job-1").as_str(), "job-1");
    }

    #[test]
    fn test_job_serialization() {
        let job = SegmentAudioJob::new("/data/in.wav", "/data/out")
            .with_job_id(JobId::from_string("job-42"));

        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"job_id\":\"job-42\""));

        let parsed: SegmentAudioJob = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.job_id, job.job_id);
        assert_eq!(parsed.output_dir, PathBuf::from("/data/out"));
    }

    #[test]
    fn test_job_config_defaults_when_missing() {
        let json = r#"{
            "job_id": "abc",
            "input_path": "a.wav",
            "output_dir": "out",
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let job: SegmentAudioJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.config, SegmentationConfig::default());
    }
}
