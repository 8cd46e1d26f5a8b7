//! Pause-based segmentation.
//!
//! # Pipeline
//!
//! ```text
//! quiet spans ──► classify_pauses ──► plan_segments ──► optimize_segments ──► write_segments
//!                 (tiers A/B/C)       (greedy window)   (merge/split/drop)    (numbered WAVs)
//! ```
//!
//! Every stage is a plain synchronous function over sample indices; the
//! engine drives them and handles I/O.

pub mod classifier;
pub mod optimizer;
pub mod planner;
pub mod stats;
pub mod writer;

pub use classifier::{classify_pauses, uniform_pauses};
pub use optimizer::optimize_segments;
pub use planner::{plan_segments, PlannerParams};
pub use stats::compute_segment_stats;
pub use writer::{prepare_output_dir, segment_file_name, write_segments, WriteOutcome};
