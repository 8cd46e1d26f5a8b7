//! Segmentation results and summary statistics.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::SegmentBoundary;

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationStatus {
    /// At least one segment was produced
    Success,
    /// Completed, but nothing useful came out (silent input, all skipped)
    Warning,
    /// The run aborted
    Error,
}

impl SegmentationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentationStatus::Success => "success",
            SegmentationStatus::Warning => "warning",
            SegmentationStatus::Error => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SegmentationStatus::Error)
    }
}

impl std::fmt::Display for SegmentationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnreadableFile,
    EmptySignal,
    UnsupportedFormat,
    NoUsablePauses,
    NoValidSegments,
    InternalProcessingError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnreadableFile => "unreadable_file",
            ErrorKind::EmptySignal => "empty_signal",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::NoUsablePauses => "no_usable_pauses",
            ErrorKind::NoValidSegments => "no_valid_segments",
            ErrorKind::InternalProcessingError => "internal_processing_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary statistics over the final segment list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct SegmentStats {
    pub total_segments: usize,
    /// Segments with duration in `[min_length, max_length]`
    pub in_range: usize,
    pub too_short: usize,
    pub too_long: usize,
    /// `in_range / total_segments` (0.0-1.0), 0 when empty
    pub success_rate: f64,
    pub avg_duration: f64,
    pub min_duration: f64,
    pub max_duration: f64,
}

/// Result of one segmentation call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SegmentationResult {
    pub status: SegmentationStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Final segments in time order
    pub segments: Vec<SegmentBoundary>,
    pub stats: SegmentStats,
    pub segments_written: usize,
    pub segments_skipped: usize,
    pub segments_failed: usize,
    /// Processing sample rate
    pub sample_rate: u32,
    /// Source duration in seconds
    pub source_duration: f64,
}

impl SegmentationResult {
    /// Successful run.
    pub fn success(
        message: impl Into<String>,
        segments: Vec<SegmentBoundary>,
        stats: SegmentStats,
    ) -> Self {
        Self {
            status: SegmentationStatus::Success,
            message: message.into(),
            error_kind: None,
            segments,
            stats,
            segments_written: 0,
            segments_skipped: 0,
            segments_failed: 0,
            sample_rate: 0,
            source_duration: 0.0,
        }
    }

    /// Completed run with nothing useful to show.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            status: SegmentationStatus::Warning,
            ..Self::success(message, Vec::new(), SegmentStats::default())
        }
    }

    /// Aborted run. Never carries partial segments.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: SegmentationStatus::Error,
            error_kind: Some(kind),
            ..Self::success(message, Vec::new(), SegmentStats::default())
        }
    }

    /// Attach source signal information.
    pub fn with_source(mut self, sample_rate: u32, source_duration: f64) -> Self {
        self.sample_rate = sample_rate;
        self.source_duration = source_duration;
        self
    }

    /// Attach writer counters.
    pub fn with_write_counts(mut self, written: usize, skipped: usize, failed: usize) -> Self {
        self.segments_written = written;
        self.segments_skipped = skipped;
        self.segments_failed = failed;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == SegmentationStatus::Success
    }
}
