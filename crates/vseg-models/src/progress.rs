//! Progress events emitted during a segmentation run.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::JobId;

/// Pipeline stage a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Load,
    Detect,
    Classify,
    Plan,
    Optimize,
    Write,
    Done,
}

impl ProcessingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStage::Load => "load",
            ProcessingStage::Detect => "detect",
            ProcessingStage::Classify => "classify",
            ProcessingStage::Plan => "plan",
            ProcessingStage::Optimize => "optimize",
            ProcessingStage::Write => "write",
            ProcessingStage::Done => "done",
        }
    }

    /// Percent range `(start, end)` covered by this stage.
    pub fn percent_range(&self) -> (u8, u8) {
        match self {
            ProcessingStage::Load => (0, 10),
            ProcessingStage::Detect => (10, 30),
            ProcessingStage::Classify => (30, 35),
            ProcessingStage::Plan => (35, 40),
            ProcessingStage::Optimize => (40, 45),
            ProcessingStage::Write => (45, 100),
            ProcessingStage::Done => (100, 100),
        }
    }

    /// Percent for a fraction (0.0-1.0) of this stage.
    pub fn percent_at(&self, fraction: f64) -> u8 {
        let (start, end) = self.percent_range();
        let span = (end - start) as f64;
        let value = start as f64 + span * fraction.clamp(0.0, 1.0);
        value.round() as u8
    }
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single progress update (0-100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub stage: ProcessingStage,
    pub percent: u8,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(job_id: JobId, stage: ProcessingStage, percent: u8) -> Self {
        Self {
            job_id,
            stage,
            percent: percent.min(100),
            timestamp: Utc::now(),
        }
    }
}
