//! Structured logging for segmentation jobs.
//!
//! The job span carries the identifying fields (job id, input file,
//! strategy), so every event a job emits, including those from the engine
//! and the progress forwarder, can be traced back to it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, info_span, warn, Span};
use vseg_models::{ProgressEvent, SegmentAudioJob, SegmentationResult, SegmentationStatus};

use crate::error::WorkerError;

/// Logger bound to one segmentation job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    input: String,
    output_dir: String,
    strategy: &'static str,
    min_length: f64,
    max_length: f64,
    submitted_at: DateTime<Utc>,
}

impl JobLogger {
    pub fn new(job: &SegmentAudioJob) -> Self {
        Self {
            job_id: job.job_id.to_string(),
            input: job.input_path.display().to_string(),
            output_dir: job.output_dir.display().to_string(),
            strategy: job.config.detector.strategy_name(),
            min_length: job.config.min_length,
            max_length: job.config.max_length,
            submitted_at: job.created_at,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn strategy(&self) -> &'static str {
        self.strategy
    }

    /// Span for the whole job, retries included.
    pub fn create_span(&self) -> Span {
        info_span!(
            "segment_job",
            job_id = %self.job_id,
            input = %self.input,
            strategy = self.strategy
        )
    }

    pub fn log_start(&self) {
        info!(
            output_dir = %self.output_dir,
            min_length = self.min_length,
            max_length = self.max_length,
            "Segmentation job started"
        );
    }

    pub fn log_progress(&self, event: &ProgressEvent) {
        info!(stage = %event.stage, percent = event.percent, "Segmentation progress");
    }

    pub fn log_timeout(&self, timeout: Duration) {
        warn!(
            timeout_secs = timeout.as_secs_f64(),
            "Attempt timed out, cancelling run"
        );
    }

    /// Log the engine's result at the level its status calls for.
    pub fn log_result(&self, result: &SegmentationResult) {
        let since_submission = self.secs_since_submission();
        match result.status {
            SegmentationStatus::Success => info!(
                segments = result.segments.len(),
                written = result.segments_written,
                skipped = result.segments_skipped,
                since_submission_secs = since_submission,
                "Segmentation job completed: {}", result.message
            ),
            SegmentationStatus::Warning => warn!(
                segments = result.segments.len(),
                written = result.segments_written,
                since_submission_secs = since_submission,
                "Segmentation job finished with warning: {}", result.message
            ),
            SegmentationStatus::Error => error!(
                kind = result.error_kind.map(|k| k.as_str()).unwrap_or("unknown"),
                since_submission_secs = since_submission,
                "Segmentation job failed: {}", result.message
            ),
        }
    }

    /// Log a job that never produced a result.
    pub fn log_failure(&self, err: &WorkerError, attempts: u32) {
        error!(
            error = %err,
            kind = %err.error_kind(),
            attempts,
            "Segmentation job abandoned"
        );
    }

    fn secs_since_submission(&self) -> f64 {
        (Utc::now() - self.submitted_at).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use vseg_models::{ErrorKind, JobId, SegmentationConfig};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        captured.text()
    }

    fn neural_job() -> SegmentAudioJob {
        SegmentAudioJob::new("/audio/talk.wav", "/tmp/out")
            .with_config(SegmentationConfig::neural())
            .with_job_id(JobId::from_string("job-42"))
    }

    #[test]
    fn test_logger_takes_job_fields() {
        let logger = JobLogger::new(&neural_job());
        assert_eq!(logger.job_id(), "job-42");
        assert_eq!(logger.strategy(), "neural");
    }

    #[test]
    fn test_span_fields_reach_every_event() {
        let logger = JobLogger::new(&neural_job());
        let output = capture(|| {
            let _guard = logger.create_span().entered();
            logger.log_start();
        });

        assert!(output.contains("segment_job"), "{}", output);
        assert!(output.contains("job-42"), "{}", output);
        assert!(output.contains("/audio/talk.wav"), "{}", output);
        assert!(output.contains("neural"), "{}", output);
        assert!(output.contains("Segmentation job started"), "{}", output);
    }

    #[test]
    fn test_result_level_follows_status() {
        let logger = JobLogger::new(&neural_job());
        let output = capture(|| {
            logger.log_result(&SegmentationResult::warning("No speech activity detected"));
            logger.log_result(&SegmentationResult::error(
                ErrorKind::UnreadableFile,
                "Cannot read audio file",
            ));
        });

        assert!(output.contains("WARN"), "{}", output);
        assert!(output.contains("No speech activity detected"), "{}", output);
        assert!(output.contains("ERROR"), "{}", output);
        assert!(output.contains("unreadable_file"), "{}", output);
    }

    #[test]
    fn test_failure_reports_attempts() {
        let logger = JobLogger::new(&neural_job());
        let output = capture(|| logger.log_failure(&WorkerError::Timeout(30), 2));

        assert!(output.contains("attempts=2"), "{}", output);
        assert!(output.contains("Segmentation job abandoned"), "{}", output);
    }
}
