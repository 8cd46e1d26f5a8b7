//! Activity detection.
//!
//! Two interchangeable strategies split a signal into quiet and active
//! spans:
//!
//! - **Energy**: amplitude + RMS thresholds with morphological smoothing.
//!   Reports quiet spans and works at the native sample rate.
//! - **Neural**: Silero VAD v5 speech probabilities. Reports speech spans
//!   and requires 16kHz input.
//!
//! Both report through [`ActivityMap`], which converts either view into the
//! other.

pub mod energy;
pub mod neural;
pub mod vad;

pub use energy::EnergyDetector;
pub use neural::{speech_intervals, NeuralDetector};
pub use vad::{SileroVad, SpeechScorer, VadError, VadResult};

use vseg_models::{complement, DetectorConfig, Interval, SegmentationConfig};

use crate::error::MediaResult;
use crate::loader::AudioBuffer;

/// Detector output, in whichever polarity the strategy produces.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityMap {
    /// Quiet spans (energy strategy)
    Quiet(Vec<Interval>),
    /// Speech spans (neural strategy)
    Active(Vec<Interval>),
}

impl ActivityMap {
    /// Quiet spans over `[0, total)`.
    pub fn quiet_intervals(&self, total: usize) -> Vec<Interval> {
        match self {
            ActivityMap::Quiet(quiet) => quiet.clone(),
            ActivityMap::Active(active) => complement(active, total),
        }
    }

    /// Active spans over `[0, total)`.
    pub fn active_intervals(&self, total: usize) -> Vec<Interval> {
        match self {
            ActivityMap::Quiet(quiet) => complement(quiet, total),
            ActivityMap::Active(active) => active.clone(),
        }
    }

    /// True when no sample is active.
    pub fn is_silent(&self, total: usize) -> bool {
        self.active_intervals(total).is_empty()
    }
}

/// Activity detection strategy.
pub enum ActivityDetector {
    Energy(EnergyDetector),
    Neural(NeuralDetector),
}

impl ActivityDetector {
    /// Build the detector named by the configuration.
    pub fn from_config(config: &SegmentationConfig) -> Self {
        match &config.detector {
            DetectorConfig::Energy(energy) => {
                ActivityDetector::Energy(EnergyDetector::new(energy.clone(), config.min_silence_secs))
            }
            DetectorConfig::Neural(neural) => {
                ActivityDetector::Neural(NeuralDetector::new(neural.clone()))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActivityDetector::Energy(_) => "energy",
            ActivityDetector::Neural(_) => "neural",
        }
    }

    /// Whether this strategy runs a speech scorer.
    pub fn uses_vad(&self) -> bool {
        matches!(self, ActivityDetector::Neural(_))
    }

    /// Hand a cached scorer to the neural strategy.
    pub fn with_cached_scorer(self, scorer: Option<Box<dyn SpeechScorer>>) -> Self {
        match self {
            ActivityDetector::Neural(detector) => {
                ActivityDetector::Neural(detector.with_scorer(scorer))
            }
            other => other,
        }
    }

    /// Take the scorer back for caching.
    pub fn take_scorer(&mut self) -> Option<Box<dyn SpeechScorer>> {
        match self {
            ActivityDetector::Neural(detector) => detector.take_scorer(),
            ActivityDetector::Energy(_) => None,
        }
    }

    /// Run detection over the whole buffer.
    pub fn detect(&mut self, buffer: &AudioBuffer) -> MediaResult<ActivityMap> {
        match self {
            ActivityDetector::Energy(detector) => {
                Ok(ActivityMap::Quiet(detector.quiet_intervals(buffer)))
            }
            ActivityDetector::Neural(detector) => {
                Ok(ActivityMap::Active(detector.speech_intervals(buffer)?))
            }
        }
    }
}
