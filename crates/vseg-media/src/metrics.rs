//! Engine metrics, recorded through the `metrics` facade.
//!
//! Nothing is exported unless the host process installs a recorder (the
//! worker installs the Prometheus exporter when configured to).

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const RUNS_TOTAL: &str = "vseg_runs_total";
    pub const RUN_DURATION_SECONDS: &str = "vseg_run_duration_seconds";
    pub const STAGE_DURATION_SECONDS: &str = "vseg_stage_duration_seconds";
    pub const SEGMENTS_WRITTEN_TOTAL: &str = "vseg_segments_written_total";
    pub const SEGMENTS_SKIPPED_TOTAL: &str = "vseg_segments_skipped_total";
    pub const SEGMENTS_FAILED_TOTAL: &str = "vseg_segments_failed_total";
    pub const AUDIO_SECONDS_PROCESSED: &str = "vseg_audio_seconds_processed_total";
}

/// Record a finished run.
pub fn record_run(status: &str, strategy: &str, duration_secs: f64) {
    let labels = [
        ("status", status.to_string()),
        ("strategy", strategy.to_string()),
    ];
    counter!(names::RUNS_TOTAL, &labels).increment(1);
    histogram!(names::RUN_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record the duration of one pipeline stage.
pub fn record_stage(stage: &str, duration_secs: f64) {
    let labels = [("stage", stage.to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record writer counters.
pub fn record_segments(written: usize, skipped: usize, failed: usize) {
    counter!(names::SEGMENTS_WRITTEN_TOTAL).increment(written as u64);
    counter!(names::SEGMENTS_SKIPPED_TOTAL).increment(skipped as u64);
    counter!(names::SEGMENTS_FAILED_TOTAL).increment(failed as u64);
}

/// Record seconds of source audio processed.
pub fn record_audio_seconds(secs: f64) {
    // Counters are integral; partial seconds round up
    counter!(names::AUDIO_SECONDS_PROCESSED).increment(secs.ceil().max(0.0) as u64);
}
