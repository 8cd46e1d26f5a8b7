//! Shared data models for the VSeg segmentation engine.
//!
//! This crate provides Serde-serializable types for:
//! - Sample intervals and classified pauses
//! - Planned and final segment boundaries
//! - Segmentation configuration (detector strategy, tier thresholds)
//! - Segmentation results and statistics
//! - Jobs and progress events exchanged with the worker

pub mod config;
pub mod interval;
pub mod job;
pub mod pause;
pub mod progress;
pub mod result;
pub mod segment;

// Re-export common types
pub use config::{
    DetectorConfig, EnergyDetectorConfig, FallbackPolicy, NeuralDetectorConfig,
    SegmentationConfig, TierRule, TierThresholds,
};
pub use interval::{complement, Interval};
pub use job::{JobId, SegmentAudioJob};
pub use pause::{ClassifiedPause, PauseTier, PauseTierError};
pub use progress::{ProcessingStage, ProgressEvent};
pub use result::{ErrorKind, SegmentStats, SegmentationResult, SegmentationStatus};
pub use segment::{PlannedSegment, SegmentBoundary};
