//! Progress reporting for segmentation runs.
//!
//! The engine only writes progress; it never waits on a consumer. Sinks
//! decide where events go (nowhere or a tokio channel), and the
//! [`ProgressReporter`] guarantees percentages never go backwards even when
//! parallel writers finish out of order.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use vseg_models::{JobId, ProcessingStage, ProgressEvent};

/// Write-only destination for progress events.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Forwards events to an unbounded tokio channel.
///
/// A dropped receiver is not an error; events are simply lost.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    /// Create a sink and the receiver that drains it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgress {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Monotonic progress emitter for one run.
pub struct ProgressReporter {
    job_id: JobId,
    sink: Arc<dyn ProgressSink>,
    last: Mutex<Option<(ProcessingStage, u8)>>,
}

impl ProgressReporter {
    pub fn new(job_id: JobId, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            job_id,
            sink,
            last: Mutex::new(None),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Report `fraction` (0.0-1.0) of `stage`.
    pub fn stage(&self, stage: ProcessingStage, fraction: f64) {
        self.report(stage, stage.percent_at(fraction));
    }

    /// Report the start of `stage`.
    pub fn begin(&self, stage: ProcessingStage) {
        self.stage(stage, 0.0);
    }

    /// Report the end of `stage`.
    pub fn end(&self, stage: ProcessingStage) {
        self.stage(stage, 1.0);
    }

    /// Report run completion (100%).
    pub fn done(&self) {
        self.report(ProcessingStage::Done, 100);
    }

    /// Emit unless it would lower the percentage or repeat the last event.
    pub fn report(&self, stage: ProcessingStage, percent: u8) {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some((last_stage, last_percent)) = *last {
            if percent < last_percent || (percent == last_percent && stage == last_stage) {
                return;
            }
        }

        *last = Some((stage, percent));
        // Emit under the lock so sinks observe events in order
        self.sink
            .emit(ProgressEvent::new(self.job_id.clone(), stage, percent));
    }
}
