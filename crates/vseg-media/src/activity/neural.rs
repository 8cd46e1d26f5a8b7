//! Speech detection with Silero VAD.
//!
//! Frame probabilities from a [`SpeechScorer`] (Silero unless another scorer
//! is supplied) are turned into speech intervals by [`speech_intervals`], a
//! pure function that can be tested without the model.

use tracing::debug;
use vseg_models::{Interval, NeuralDetectorConfig};

use super::vad::{SileroVad, SpeechScorer};
use crate::error::{MediaError, MediaResult};
use crate::loader::AudioBuffer;

/// Speech detector backed by a (lazily created) Silero model.
pub struct NeuralDetector {
    config: NeuralDetectorConfig,
    scorer: Option<Box<dyn SpeechScorer>>,
}

impl NeuralDetector {
    pub fn new(config: NeuralDetectorConfig) -> Self {
        Self {
            config,
            scorer: None,
        }
    }

    /// Reuse an existing scorer. Its state is reset before use; a scorer
    /// built for another sample rate is replaced by a fresh Silero model.
    pub fn with_scorer(mut self, scorer: Option<Box<dyn SpeechScorer>>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Hand the scorer back for caching.
    pub fn take_scorer(&mut self) -> Option<Box<dyn SpeechScorer>> {
        self.scorer.take()
    }

    pub fn config(&self) -> &NeuralDetectorConfig {
        &self.config
    }

    /// Sorted, disjoint speech intervals of the buffer.
    pub fn speech_intervals(&mut self, buffer: &AudioBuffer) -> MediaResult<Vec<Interval>> {
        let rate = buffer.sample_rate() as usize;

        match self.scorer.as_mut() {
            Some(scorer) if scorer.sample_rate() == rate => scorer.reset()?,
            _ => self.scorer = Some(Box::new(SileroVad::new(rate)?)),
        }
        let scorer = self
            .scorer
            .as_mut()
            .ok_or_else(|| MediaError::internal("VAD model unavailable"))?;

        let frame_size = scorer.frame_size();
        let probabilities = scorer.frame_probabilities(buffer.samples());
        if probabilities.is_empty() && !buffer.is_empty() {
            return Err(MediaError::internal(format!(
                "Signal shorter than one VAD frame ({} samples)",
                frame_size
            )));
        }

        let speech = speech_intervals(
            &probabilities,
            frame_size,
            buffer.sample_rate(),
            buffer.len(),
            &self.config,
        );

        debug!(
            frames = probabilities.len(),
            speech_intervals = speech.len(),
            threshold = self.config.threshold,
            "Neural detection complete"
        );

        Ok(speech)
    }
}

/// Convert per-frame speech probabilities into speech intervals.
///
/// Consecutive frames at or above the threshold form raw intervals. Raw
/// intervals shorter than `min_speech_ms` are discarded, the rest are padded
/// on both sides and merged when they overlap or their gap is shorter than
/// `min_silence_gap_ms`.
pub fn speech_intervals(
    probabilities: &[f32],
    frame_size: usize,
    sample_rate: u32,
    total: usize,
    config: &NeuralDetectorConfig,
) -> Vec<Interval> {
    let ms_to_samples = |ms: u64| (ms as usize * sample_rate as usize) / 1000;
    let padding = ms_to_samples(config.padding_ms);
    let min_gap = ms_to_samples(config.min_silence_gap_ms);
    let min_speech = ms_to_samples(config.min_speech_ms);

    let mut raw = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, prob) in probabilities.iter().enumerate() {
        let is_speech = *prob >= config.threshold;
        match (run_start, is_speech) {
            (None, true) => run_start = Some(i),
            (Some(start), false) => {
                raw.push((start * frame_size, i * frame_size));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        raw.push((start * frame_size, probabilities.len() * frame_size));
    }

    let mut merged: Vec<Interval> = Vec::with_capacity(raw.len());
    for (start, end) in raw {
        if end - start < min_speech {
            continue;
        }
        let start = start.saturating_sub(padding).min(total);
        let end = (end + padding).min(total);
        let Some(padded) = Interval::new(start, end) else {
            continue;
        };

        match merged.last_mut() {
            Some(last) if padded.start <= last.end || padded.start - last.end < min_gap => {
                last.end = last.end.max(padded.end);
            }
            _ => merged.push(padded),
        }
    }

    merged
}
