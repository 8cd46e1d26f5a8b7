//! Wrapper for Silero VAD v5 using the voice_activity_detector crate.
//!
//! Silero VAD v5 supports:
//! - 8kHz: 256 samples per frame (~32ms)
//! - 16kHz: 512 samples per frame (~32ms)
//!
//! The loader resamples input to 16kHz before it reaches this module.

use thiserror::Error;
use tracing::{debug, trace};
use voice_activity_detector::VoiceActivityDetector;

/// Errors from VAD operations.
#[derive(Error, Debug)]
pub enum VadError {
    #[error("Failed to initialize Silero VAD: {0}")]
    InitializationFailed(String),

    #[error("Invalid audio format: {0}")]
    InvalidAudioFormat(String),
}

/// Result type for VAD operations.
pub type VadResult<T> = Result<T, VadError>;

/// Source of per-frame speech probabilities.
///
/// [`SileroVad`] is the production scorer. Implementations carry state
/// between frames, so `reset` is called before every new stream.
pub trait SpeechScorer: Send {
    /// Sample rate the scorer expects.
    fn sample_rate(&self) -> usize;

    /// Samples per scored frame.
    fn frame_size(&self) -> usize;

    /// Speech probability (0.0-1.0) of every complete frame.
    fn frame_probabilities(&mut self, samples: &[f32]) -> Vec<f32>;

    /// Clear state left over from the previous stream.
    fn reset(&mut self) -> VadResult<()>;
}

/// Silero VAD model handle.
///
/// The model carries recurrent state between frames, so one handle must only
/// process one stream at a time. Call [`SileroVad::reset`] between streams.
pub struct SileroVad {
    vad: VoiceActivityDetector,
    sample_rate: usize,
    frame_size: usize,
}

impl SileroVad {
    /// Create a new SileroVad instance.
    ///
    /// # Arguments
    /// - `sample_rate`: Audio sample rate (8000 or 16000 supported)
    pub fn new(sample_rate: usize) -> VadResult<Self> {
        let frame_size = frame_size_for(sample_rate)?;
        let vad = build_detector(sample_rate, frame_size)?;

        debug!(
            sample_rate = sample_rate,
            frame_size = frame_size,
            "Initialized Silero VAD v5"
        );

        Ok(Self {
            vad,
            sample_rate,
            frame_size,
        })
    }

    /// Expected frame size for this instance.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Frame duration in milliseconds.
    pub fn frame_duration_ms(&self) -> u64 {
        (self.frame_size * 1000 / self.sample_rate) as u64
    }

    pub fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    /// Speech probability (0.0-1.0) for one frame of samples in [-1.0, 1.0].
    pub fn analyze_frame(&mut self, samples: &[f32]) -> f32 {
        if samples.len() != self.frame_size {
            trace!(
                expected = self.frame_size,
                got = samples.len(),
                "Frame size mismatch (will be padded/truncated)"
            );
        }

        let prob = self.vad.predict(samples.iter().copied());
        trace!(speech_prob = prob, "VAD frame analyzed");
        prob
    }

    /// Speech probability of every complete frame; a trailing partial frame is ignored.
    pub fn frame_probabilities(&mut self, samples: &[f32]) -> Vec<f32> {
        let frame_size = self.frame_size;
        samples
            .chunks_exact(frame_size)
            .map(|chunk| self.analyze_frame(chunk))
            .collect()
    }

    /// Reset the recurrent state before processing a new stream.
    pub fn reset(&mut self) -> VadResult<()> {
        // The crate has no reset method; rebuild the detector instead
        self.vad = build_detector(self.sample_rate, self.frame_size)?;
        debug!("VAD state reset");
        Ok(())
    }
}

impl SpeechScorer for SileroVad {
    fn sample_rate(&self) -> usize {
        SileroVad::sample_rate(self)
    }

    fn frame_size(&self) -> usize {
        SileroVad::frame_size(self)
    }

    fn frame_probabilities(&mut self, samples: &[f32]) -> Vec<f32> {
        SileroVad::frame_probabilities(self, samples)
    }

    fn reset(&mut self) -> VadResult<()> {
        SileroVad::reset(self)
    }
}

fn frame_size_for(sample_rate: usize) -> VadResult<usize> {
    match sample_rate {
        8000 => Ok(256),
        16000 => Ok(512),
        _ => Err(VadError::InvalidAudioFormat(format!(
            "Sample rate must be 8000 or 16000, got {}",
            sample_rate
        ))),
    }
}

fn build_detector(sample_rate: usize, frame_size: usize) -> VadResult<VoiceActivityDetector> {
    VoiceActivityDetector::builder()
        .sample_rate(sample_rate as i64)
        .chunk_size(frame_size)
        .build()
        .map_err(|e| VadError::InitializationFailed(format!("Failed to create VAD: {:?}", e)))
}
