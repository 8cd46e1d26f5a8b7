//! Segmentation engine.
//!
//! [`SegmentationEngine`] is the long-lived context a process creates once.
//! It owns the cached speech scorer (a Silero model created on first neural
//! run, reset for every run) and run counters. Each call to
//! [`SegmentationEngine::run`] loads one recording, detects pauses, plans and
//! optimizes boundaries and writes the numbered segments.
//!
//! Runs started with a [`CancelToken`] stop at the next stage boundary or
//! segment file once the token is cancelled, and remove the files they had
//! already written.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, error, info, warn};
use vseg_models::{
    DetectorConfig, JobId, PlannedSegment, ProcessingStage, SegmentAudioJob, SegmentationConfig,
    SegmentationResult,
};

use crate::activity::{ActivityDetector, SpeechScorer};
use crate::cancel::CancelToken;
use crate::error::{MediaError, MediaResult};
use crate::loader::{load_audio, AudioBuffer};
use crate::metrics;
use crate::progress::{ProgressReporter, ProgressSink};
use crate::segmentation::{
    classify_pauses, compute_segment_stats, optimize_segments, plan_segments, prepare_output_dir,
    uniform_pauses, write_segments, PlannerParams, WriteOutcome,
};

/// Result of the CPU-bound analysis stages.
enum Analysis {
    /// No active sample in the whole signal
    Silent,
    /// Final (optimized) segments
    Planned(Vec<PlannedSegment>),
}

type ScorerCache = Mutex<Option<Box<dyn SpeechScorer>>>;

/// Long-lived segmentation context.
pub struct SegmentationEngine {
    scorer_cache: Arc<ScorerCache>,
    runs_started: AtomicU64,
    runs_failed: AtomicU64,
}

impl Default for SegmentationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentationEngine {
    pub fn new() -> Self {
        Self {
            scorer_cache: Arc::new(Mutex::new(None)),
            runs_started: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
        }
    }

    /// Engine whose neural runs score frames with `scorer` instead of
    /// loading Silero. A run at another sample rate still loads Silero.
    pub fn with_speech_scorer(scorer: Box<dyn SpeechScorer>) -> Self {
        let engine = Self::new();
        *lock_cache(&engine.scorer_cache) = Some(scorer);
        engine
    }

    /// Runs started since creation.
    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::Relaxed)
    }

    /// Runs that ended with `status = error`.
    pub fn runs_failed(&self) -> u64 {
        self.runs_failed.load(Ordering::Relaxed)
    }

    /// Run a queued job.
    pub async fn run_job(
        &self,
        job: &SegmentAudioJob,
        sink: Arc<dyn ProgressSink>,
    ) -> SegmentationResult {
        self.run_job_with_cancel(job, sink, CancelToken::new()).await
    }

    /// Run a queued job that stops once `cancel` is cancelled.
    pub async fn run_job_with_cancel(
        &self,
        job: &SegmentAudioJob,
        sink: Arc<dyn ProgressSink>,
        cancel: CancelToken,
    ) -> SegmentationResult {
        self.run_with_cancel(
            job.job_id.clone(),
            &job.input_path,
            &job.output_dir,
            &job.config,
            sink,
            cancel,
        )
        .await
    }

    /// Segment `input` into `output_dir`.
    ///
    /// Failures never escape as `Err`: they come back as a result with
    /// `status = error` and no segments.
    pub async fn run(
        &self,
        job_id: JobId,
        input: &Path,
        output_dir: &Path,
        config: &SegmentationConfig,
        sink: Arc<dyn ProgressSink>,
    ) -> SegmentationResult {
        self.run_with_cancel(job_id, input, output_dir, config, sink, CancelToken::new())
            .await
    }

    /// [`run`](Self::run) with cooperative cancellation.
    ///
    /// A cancelled run returns an error result and leaves none of its
    /// segment files behind.
    pub async fn run_with_cancel(
        &self,
        job_id: JobId,
        input: &Path,
        output_dir: &Path,
        config: &SegmentationConfig,
        sink: Arc<dyn ProgressSink>,
        cancel: CancelToken,
    ) -> SegmentationResult {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let strategy = config.detector.strategy_name();

        info!(
            job_id = %job_id,
            input = %input.display(),
            output_dir = %output_dir.display(),
            strategy,
            min_length = config.min_length,
            max_length = config.max_length,
            "Starting segmentation"
        );

        let reporter = Arc::new(ProgressReporter::new(job_id.clone(), sink));
        let result = match self
            .try_run(input, output_dir, config, &reporter, &cancel)
            .await
        {
            Ok(result) => {
                reporter.done();
                result
            }
            Err(e @ MediaError::Cancelled) => {
                self.runs_failed.fetch_add(1, Ordering::Relaxed);
                warn!(job_id = %job_id, "Segmentation cancelled");
                SegmentationResult::error(e.kind(), e.to_string())
            }
            Err(e) => {
                self.runs_failed.fetch_add(1, Ordering::Relaxed);
                error!(job_id = %job_id, error = %e, kind = %e.kind(), "Segmentation failed");
                SegmentationResult::error(e.kind(), e.to_string())
            }
        };

        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_run(result.status.as_str(), strategy, elapsed);
        info!(
            job_id = %job_id,
            status = %result.status,
            segments = result.segments.len(),
            written = result.segments_written,
            elapsed_secs = format!("{:.2}", elapsed),
            "Segmentation finished"
        );

        result
    }

    async fn try_run(
        &self,
        input: &Path,
        output_dir: &Path,
        config: &SegmentationConfig,
        reporter: &Arc<ProgressReporter>,
        cancel: &CancelToken,
    ) -> MediaResult<SegmentationResult> {
        config.validate().map_err(MediaError::invalid_config)?;
        cancel.checkpoint()?;

        reporter.begin(ProcessingStage::Load);
        let stage_start = Instant::now();
        let buffer = Arc::new(load_audio(input, config.required_sample_rate()).await?);
        metrics::record_stage("load", stage_start.elapsed().as_secs_f64());
        metrics::record_audio_seconds(buffer.duration_secs());
        reporter.end(ProcessingStage::Load);
        cancel.checkpoint()?;

        let sample_rate = buffer.sample_rate();
        let source_duration = buffer.duration_secs();

        let analysis = {
            let buffer = Arc::clone(&buffer);
            let config = config.clone();
            let cache = Arc::clone(&self.scorer_cache);
            let reporter = Arc::clone(reporter);
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                analyze(&buffer, &config, &cache, &reporter, &cancel)
            })
            .await
            .map_err(|e| MediaError::internal(format!("Analysis task failed: {}", e)))??
        };

        let segments = match analysis {
            Analysis::Silent => {
                info!("No speech activity detected");
                return Ok(
                    SegmentationResult::warning("No speech activity detected in the recording")
                        .with_source(sample_rate, source_duration),
                );
            }
            Analysis::Planned(segments) if segments.is_empty() => {
                return Err(MediaError::NoValidSegments {
                    duration: source_duration,
                    min_length: config.min_length,
                });
            }
            Analysis::Planned(segments) => segments,
        };

        cancel.checkpoint()?;
        prepare_output_dir(output_dir, config.clear_output_dir).await?;
        reporter.begin(ProcessingStage::Write);

        let stage_start = Instant::now();
        let outcome = {
            let buffer = Arc::clone(&buffer);
            let segments = segments.clone();
            let output_dir = output_dir.to_path_buf();
            let prefix = config.file_prefix.clone();
            let reporter = Arc::clone(reporter);
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                write_segments(
                    &buffer,
                    &segments,
                    &output_dir,
                    prefix.as_deref(),
                    &reporter,
                    &cancel,
                )
            })
            .await
            .map_err(|e| MediaError::internal(format!("Write task failed: {}", e)))?
        };
        if cancel.is_cancelled() {
            remove_written(output_dir, &outcome).await;
            return Err(MediaError::Cancelled);
        }
        metrics::record_stage("write", stage_start.elapsed().as_secs_f64());
        metrics::record_segments(outcome.written, outcome.skipped, outcome.failed);

        let stats = compute_segment_stats(&segments, sample_rate, config.min_length, config.max_length);
        debug!(
            total = stats.total_segments,
            in_range = stats.in_range,
            too_short = stats.too_short,
            too_long = stats.too_long,
            success_rate = format!("{:.2}", stats.success_rate),
            avg_duration = format!("{:.2}", stats.avg_duration),
            "Segment statistics"
        );

        let mut result = if outcome.written > 0 {
            SegmentationResult::success(
                format!("Created {} segments", outcome.written),
                Vec::new(),
                stats,
            )
        } else {
            SegmentationResult {
                stats,
                ..SegmentationResult::warning("No segment files were written")
            }
        };
        result.segments = outcome.boundaries;

        Ok(result
            .with_source(sample_rate, source_duration)
            .with_write_counts(outcome.written, outcome.skipped, outcome.failed))
    }
}

/// Detection, classification, planning and optimization.
fn analyze(
    buffer: &AudioBuffer,
    config: &SegmentationConfig,
    scorer_cache: &ScorerCache,
    reporter: &ProgressReporter,
    cancel: &CancelToken,
) -> MediaResult<Analysis> {
    let total = buffer.len();
    let sample_rate = buffer.sample_rate();

    reporter.begin(ProcessingStage::Detect);
    let stage_start = Instant::now();
    let mut detector = ActivityDetector::from_config(config);
    if detector.uses_vad() {
        detector = detector.with_cached_scorer(lock_cache(scorer_cache).take());
    }
    let detected = detector.detect(buffer);
    if let Some(scorer) = detector.take_scorer() {
        *lock_cache(scorer_cache) = Some(scorer);
    }
    let activity = detected?;
    metrics::record_stage("detect", stage_start.elapsed().as_secs_f64());
    reporter.end(ProcessingStage::Detect);
    cancel.checkpoint()?;

    if activity.is_silent(total) {
        return Ok(Analysis::Silent);
    }

    let quiet = activity.quiet_intervals(total);
    let pauses = match &config.detector {
        DetectorConfig::Energy(_) => classify_pauses(&quiet, buffer, &config.tiers),
        DetectorConfig::Neural(neural) => {
            let min_len = buffer.secs_to_samples(config.min_silence_secs);
            let gaps: Vec<_> = quiet.into_iter().filter(|iv| iv.len() >= min_len).collect();
            uniform_pauses(&gaps, sample_rate, neural.uniform_tier)
        }
    };
    reporter.end(ProcessingStage::Classify);
    cancel.checkpoint()?;

    let params = PlannerParams::from_config(config, sample_rate);
    let planned = plan_segments(&pauses, total, &params)?;
    reporter.end(ProcessingStage::Plan);

    let segments = optimize_segments(&planned, &params);
    reporter.end(ProcessingStage::Optimize);

    debug!(
        pauses = pauses.len(),
        planned = planned.len(),
        optimized = segments.len(),
        "Analysis complete"
    );

    Ok(Analysis::Planned(segments))
}

/// Delete the files a cancelled run managed to write.
async fn remove_written(output_dir: &Path, outcome: &WriteOutcome) {
    let mut removed = 0usize;
    for name in outcome.written_files() {
        let path = output_dir.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove segment"),
        }
    }
    debug!(removed, cancelled = outcome.cancelled, "Removed segments of cancelled run");
}

fn lock_cache(cache: &ScorerCache) -> MutexGuard<'_, Option<Box<dyn SpeechScorer>>> {
    match cache.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{ChannelProgress, NoopProgress};
    use tempfile::TempDir;
    use vseg_models::{ErrorKind, ProgressEvent, SegmentationStatus};

    const RATE: u32 = 16_000;

    fn write_wav(path: &Path, samples: &[f32]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: RATE,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn wav_count(dir: &Path) -> usize {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "wav"))
                .count(),
            Err(_) => 0,
        }
    }

    /// Cancels the run as soon as the first segment file is reported.
    struct CancelAfterFirstFile {
        cancel: CancelToken,
    }

    impl ProgressSink for CancelAfterFirstFile {
        fn emit(&self, event: ProgressEvent) {
            if event.stage == ProcessingStage::Write
                && event.percent > ProcessingStage::Write.percent_at(0.0)
            {
                self.cancel.cancel();
            }
        }
    }

    fn tone(secs: f64) -> Vec<f32> {
        let n = (secs * RATE as f64) as usize;
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * 200.0 * i as f64 / RATE as f64).sin() as f32 * 0.4)
            .collect()
    }

    #[tokio::test]
    async fn test_silent_input_is_warning() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("silence.wav");
        write_wav(&input, &vec![0.0; RATE as usize * 8]);

        let engine = SegmentationEngine::new();
        let result = engine
            .run(
                JobId::new(),
                &input,
                &dir.path().join("out"),
                &SegmentationConfig::default(),
                Arc::new(NoopProgress),
            )
            .await;

        assert_eq!(result.status, SegmentationStatus::Warning);
        assert!(result.segments.is_empty());
        assert_eq!(result.sample_rate, RATE);
        assert_eq!(engine.runs_failed(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("tone.wav");
        write_wav(&input, &tone(1.0));

        let engine = SegmentationEngine::new();
        let config = SegmentationConfig::default().with_lengths(10.0, 2.0);
        let result = engine
            .run(JobId::new(), &input, dir.path(), &config, Arc::new(NoopProgress))
            .await;

        assert_eq!(result.status, SegmentationStatus::Error);
        assert_eq!(result.error_kind, Some(ErrorKind::InternalProcessingError));
        assert_eq!(engine.runs_started(), 1);
        assert_eq!(engine.runs_failed(), 1);
    }

    #[tokio::test]
    async fn test_missing_input_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let engine = SegmentationEngine::new();
        let result = engine
            .run(
                JobId::new(),
                &dir.path().join("nope.wav"),
                dir.path(),
                &SegmentationConfig::default(),
                Arc::new(NoopProgress),
            )
            .await;

        assert_eq!(result.error_kind, Some(ErrorKind::UnreadableFile));
        assert!(result.segments.is_empty());
    }

    #[tokio::test]
    async fn test_run_job_reports_progress_to_100() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("speech.wav");
        let mut samples = tone(6.0);
        samples.extend(vec![0.0; RATE as usize / 2]);
        samples.extend(tone(6.0));
        write_wav(&input, &samples);

        let job = SegmentAudioJob::new(&input, dir.path().join("out"))
            .with_config(SegmentationConfig::default().with_lengths(3.0, 10.0));
        let (sink, mut rx) = ChannelProgress::new();

        let engine = SegmentationEngine::new();
        let result = engine.run_job(&job, Arc::new(sink)).await;
        assert_eq!(result.status, SegmentationStatus::Success, "{}", result.message);
        assert_eq!(result.segments_written, 2);

        let mut percents = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.job_id, job.job_id);
            percents.push(event.percent);
        }
        assert_eq!(percents.first(), Some(&0));
        assert_eq!(percents.last(), Some(&100));
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_cancelled_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("tone.wav");
        write_wav(&input, &tone(12.0));
        let out = dir.path().join("out");

        let cancel = CancelToken::new();
        cancel.cancel();
        let engine = SegmentationEngine::new();
        let result = engine
            .run_with_cancel(
                JobId::new(),
                &input,
                &out,
                &SegmentationConfig::default().with_lengths(3.0, 5.0),
                Arc::new(NoopProgress),
                cancel,
            )
            .await;

        assert_eq!(result.status, SegmentationStatus::Error);
        assert_eq!(result.error_kind, Some(ErrorKind::InternalProcessingError));
        assert_eq!(wav_count(&out), 0);
        assert_eq!(engine.runs_failed(), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_write_removes_written_files() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("tone.wav");
        write_wav(&input, &tone(20.0));
        let out = dir.path().join("out");

        let cancel = CancelToken::new();
        let sink = CancelAfterFirstFile {
            cancel: cancel.clone(),
        };
        let engine = SegmentationEngine::new();
        let result = engine
            .run_with_cancel(
                JobId::new(),
                &input,
                &out,
                &SegmentationConfig::default().with_lengths(0.5, 1.0),
                Arc::new(sink),
                cancel.clone(),
            )
            .await;

        assert!(cancel.is_cancelled());
        assert_eq!(result.status, SegmentationStatus::Error);
        assert!(result.segments.is_empty());
        assert_eq!(wav_count(&out), 0);
    }
}
