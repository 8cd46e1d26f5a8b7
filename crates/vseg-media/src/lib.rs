#![deny(unreachable_patterns)]
//! Audio segmentation engine.
//!
//! This crate provides:
//! - Audio loading (WAV natively, everything else through FFmpeg)
//! - Energy and Silero VAD activity detection
//! - Pause classification, boundary planning and optimization
//! - Parallel WAV writing of the final segments
//! - Progress reporting, cooperative cancellation and `metrics` instrumentation

pub mod activity;
pub mod cancel;
pub mod command;
pub mod engine;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod probe;
pub mod progress;
pub mod resample;
pub mod segmentation;

pub use activity::{
    ActivityDetector, ActivityMap, EnergyDetector, NeuralDetector, SileroVad, SpeechScorer,
    VadError,
};
pub use cancel::CancelToken;
pub use command::{check_ffmpeg, check_ffprobe, create_ffmpeg_command, FfmpegCommand, FfmpegRunner};
pub use engine::SegmentationEngine;
pub use error::{MediaError, MediaResult};
pub use loader::{load_audio, AudioBuffer};
pub use probe::{probe_audio, AudioStreamInfo};
pub use progress::{ChannelProgress, NoopProgress, ProgressReporter, ProgressSink};
pub use resample::resample;
pub use segmentation::{
    classify_pauses, compute_segment_stats, optimize_segments, plan_segments, uniform_pauses,
    write_segments, PlannerParams, WriteOutcome,
};
