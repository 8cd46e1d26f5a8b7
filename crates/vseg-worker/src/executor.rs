//! Job executor.
//!
//! Each attempt runs the engine in its own task. When the job timeout fires
//! the attempt cancels the run and waits for it to return, so a retry never
//! shares the output directory with a still-running attempt.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, Instrument};
use vseg_media::{CancelToken, ChannelProgress, MediaError, SegmentationEngine};
use vseg_models::{SegmentAudioJob, SegmentationResult};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::retry::{retry_async, RetryConfig, RetryResult};

const OPERATION: &str = "segment_audio";

/// Runs segmentation jobs against a shared engine.
pub struct JobExecutor {
    config: WorkerConfig,
    engine: Arc<SegmentationEngine>,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig) -> Self {
        Self::with_engine(config, Arc::new(SegmentationEngine::new()))
    }

    pub fn with_engine(config: WorkerConfig, engine: Arc<SegmentationEngine>) -> Self {
        Self { config, engine }
    }

    pub fn engine(&self) -> &SegmentationEngine {
        &self.engine
    }

    /// Execute one job with timeout and retry handling.
    ///
    /// Engine failures come back as `Ok` with `status = error`; `Err` means
    /// the job never produced a result (bad configuration, timeouts that
    /// outlived every retry).
    pub async fn execute(&self, job: &SegmentAudioJob) -> WorkerResult<SegmentationResult> {
        let logger = JobLogger::new(job);
        let span = logger.create_span();

        async {
            logger.log_start();

            job.config.validate().map_err(MediaError::invalid_config)?;

            let retry = RetryConfig::new(OPERATION)
                .with_max_retries(self.config.max_retries)
                .with_base_delay(self.config.retry_base_delay)
                .with_max_delay(self.config.retry_max_delay);

            let outcome = retry_async(
                &retry,
                || self.attempt(job, &logger),
                WorkerError::is_retryable,
            )
            .await;

            match outcome {
                RetryResult::Success(result) => {
                    record_job(result.status.as_str());
                    logger.log_result(&result);
                    Ok(result)
                }
                RetryResult::Failed { error, attempts } => {
                    record_job("failed");
                    logger.log_failure(&error, attempts);
                    Err(error)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// One engine run under the job timeout, with progress forwarded to the log.
    async fn attempt(
        &self,
        job: &SegmentAudioJob,
        logger: &JobLogger,
    ) -> WorkerResult<SegmentationResult> {
        let (sink, mut events) = ChannelProgress::new();
        let progress_logger = logger.clone();
        let forwarder = tokio::spawn(
            async move {
                while let Some(event) = events.recv().await {
                    progress_logger.log_progress(&event);
                }
            }
            .in_current_span(),
        );

        let cancel = CancelToken::new();
        let mut run = {
            let engine = Arc::clone(&self.engine);
            let job = job.clone();
            let cancel = cancel.clone();
            tokio::spawn(
                async move { engine.run_job_with_cancel(&job, Arc::new(sink), cancel).await }
                    .in_current_span(),
            )
        };

        let joined = match tokio::time::timeout(self.config.job_timeout, &mut run).await {
            Ok(joined) => joined,
            Err(_) => {
                logger.log_timeout(self.config.job_timeout);
                counter!("vseg_worker_timeouts_total").increment(1);
                cancel.cancel();
                // A cancelled run removes its own files before returning
                let late = run.await;
                forwarder.await.ok();
                match late {
                    Ok(result) if !result.status.is_error() => {
                        debug!("Run completed before it saw the cancellation");
                        return Ok(result);
                    }
                    Ok(_) => {}
                    Err(e) => debug!(error = %e, "Cancelled run did not finish cleanly"),
                }
                return Err(WorkerError::Timeout(self.config.job_timeout.as_secs()));
            }
        };

        // The sender is gone once the run returns, so this drains and ends
        forwarder.await.ok();
        joined.map_err(|e| WorkerError::job_failed(format!("Segmentation task failed: {}", e)))
    }
}

fn record_job(outcome: &str) {
    counter!("vseg_worker_jobs_total", "outcome" => outcome.to_string()).increment(1);
}
