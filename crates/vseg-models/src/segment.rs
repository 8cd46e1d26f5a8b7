//! Planned and final segment boundaries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A `[start, end)` sample range chosen by the boundary planner.
///
/// Length bounds are not guaranteed until the optimizer has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct PlannedSegment {
    pub start: usize,
    pub end: usize,
}

impl PlannedSegment {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in samples.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds.
    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.len() as f64 / sample_rate as f64
    }

    /// Sample at the temporal midpoint.
    pub fn midpoint(&self) -> usize {
        self.start + self.len() / 2
    }
}

/// A final segment as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentBoundary {
    /// 1-based position in the final segment list
    pub index: usize,
    /// First sample (inclusive)
    pub start_sample: usize,
    /// Last sample (exclusive)
    pub end_sample: usize,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Duration in seconds
    pub duration: f64,
    /// Artifact file name, when one was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl SegmentBoundary {
    /// Build a boundary from a planned segment.
    pub fn from_planned(index: usize, segment: &PlannedSegment, sample_rate: u32) -> Self {
        let rate = sample_rate as f64;
        Self {
            index,
            start_sample: segment.start,
            end_sample: segment.end,
            start: segment.start as f64 / rate,
            end: segment.end as f64 / rate,
            duration: segment.duration_secs(sample_rate),
            file_name: None,
        }
    }
}
