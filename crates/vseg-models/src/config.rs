//! Configuration for audio segmentation.
//!
//! These parameters control the accepted segment length window, how quiet
//! spans are detected, and how pauses are ranked as cut candidates. Every
//! struct is `#[serde(default)]` so a partial JSON document only overrides
//! the fields it names.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::PauseTier;

/// Sample rate required by the neural detector (Silero VAD v5).
pub const NEURAL_SAMPLE_RATE: u32 = 16_000;

/// Top-level segmentation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Minimum segment length in seconds.
    pub min_length: f64,

    /// Maximum segment length in seconds.
    pub max_length: f64,

    /// Shortest quiet span (seconds) kept as a pause candidate.
    ///
    /// - 0.05s: keeps breaths and short hesitations (default)
    /// - 0.2s+: only clear sentence-level pauses
    pub min_silence_secs: f64,

    /// Activity detection strategy and its thresholds.
    pub detector: DetectorConfig,

    /// Duration/noise thresholds for pause tiers (energy strategy).
    pub tiers: TierThresholds,

    /// Keep a trailing segment shorter than `min_length`.
    pub allow_short_final: bool,

    /// Extra seconds the planner may search past `max_length`.
    ///
    /// Segments that overrun `max_length` are split by the optimizer.
    pub max_extension: f64,

    /// What the planner does when no pause falls inside the search window.
    pub fallback: FallbackPolicy,

    /// Remove existing files from the output directory before writing.
    pub clear_output_dir: bool,

    /// Optional prefix for artifact names (`<prefix>_segment_0001.wav`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_prefix: Option<String>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_length: 5.0,
            max_length: 15.0,
            min_silence_secs: 0.05,
            detector: DetectorConfig::default(),
            tiers: TierThresholds::default(),
            allow_short_final: false,
            max_extension: 0.0,
            fallback: FallbackPolicy::default(),
            clear_output_dir: true,
            file_prefix: None,
        }
    }
}

impl SegmentationConfig {
    /// Configuration using the neural (Silero VAD) detector.
    pub fn neural() -> Self {
        Self {
            detector: DetectorConfig::Neural(NeuralDetectorConfig::default()),
            ..Default::default()
        }
    }

    /// Builder-style setter for the length window.
    pub fn with_lengths(mut self, min_length: f64, max_length: f64) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    /// Builder-style setter for the minimum pause duration.
    pub fn with_min_silence_secs(mut self, secs: f64) -> Self {
        self.min_silence_secs = secs;
        self
    }

    /// Builder-style setter for the detector strategy.
    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    /// Builder-style setter for short trailing segments.
    pub fn with_allow_short_final(mut self, allow: bool) -> Self {
        self.allow_short_final = allow;
        self
    }

    /// Builder-style setter for the search-window extension.
    pub fn with_max_extension(mut self, secs: f64) -> Self {
        self.max_extension = secs.max(0.0);
        self
    }

    /// Builder-style setter for the planner fallback.
    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Builder-style setter for the artifact name prefix.
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = Some(prefix.into());
        self
    }

    /// Sample rate the loader must deliver, if the detector mandates one.
    pub fn required_sample_rate(&self) -> Option<u32> {
        self.detector.required_sample_rate()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_length > 0.0) {
            return Err(format!("min_length must be > 0, got {}", self.min_length));
        }
        if !(self.max_length > self.min_length) {
            return Err(format!(
                "max_length ({}) must be greater than min_length ({})",
                self.max_length, self.min_length
            ));
        }
        if !(self.min_silence_secs >= 0.0) {
            return Err(format!(
                "min_silence_secs must be >= 0, got {}",
                self.min_silence_secs
            ));
        }
        if !(self.max_extension >= 0.0) {
            return Err(format!(
                "max_extension must be >= 0, got {}",
                self.max_extension
            ));
        }
        self.tiers.validate()?;
        self.detector.validate()
    }
}

/// What the planner does when the search window holds no pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Cut at the end of the search window.
    #[default]
    HardCut,
    /// Cut at the next pause after the cursor, even outside the window.
    ///
    /// Fails with `NoUsablePauses` when the signal has no pauses at all.
    NextPause,
}

/// Activity detection strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DetectorConfig {
    /// Amplitude + RMS thresholding with morphological smoothing.
    Energy(EnergyDetectorConfig),
    /// Silero VAD speech/non-speech classifier.
    Neural(NeuralDetectorConfig),
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig::Energy(EnergyDetectorConfig::default())
    }
}

impl DetectorConfig {
    /// Strategy name as a string.
    pub fn strategy_name(&self) -> &'static str {
        match self {
            DetectorConfig::Energy(_) => "energy",
            DetectorConfig::Neural(_) => "neural",
        }
    }

    /// Sample rate the strategy requires (`None` = native rate).
    pub fn required_sample_rate(&self) -> Option<u32> {
        match self {
            DetectorConfig::Energy(_) => None,
            DetectorConfig::Neural(_) => Some(NEURAL_SAMPLE_RATE),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            DetectorConfig::Energy(config) => config.validate(),
            DetectorConfig::Neural(config) => config.validate(),
        }
    }
}

/// Thresholds for the energy detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EnergyDetectorConfig {
    /// Samples with `|x|` below this are quiet by amplitude.
    pub amplitude_threshold: f32,

    /// Frames with RMS below this are quiet by energy.
    pub rms_threshold: f32,

    /// RMS frame length in samples.
    pub rms_frame_length: usize,

    /// RMS hop length in samples.
    pub rms_hop_length: usize,

    /// Erosion margin in milliseconds (drops spurious dropouts).
    pub erosion_ms: u64,

    /// Dilation margin in milliseconds (restores pause width).
    pub dilation_ms: u64,
}

impl Default for EnergyDetectorConfig {
    fn default() -> Self {
        Self {
            amplitude_threshold: 0.01,
            rms_threshold: 0.005,
            rms_frame_length: 1024,
            rms_hop_length: 512,
            erosion_ms: 20,
            dilation_ms: 30,
        }
    }
}

impl EnergyDetectorConfig {
    fn validate(&self) -> Result<(), String> {
        if !(self.amplitude_threshold > 0.0) {
            return Err("amplitude_threshold must be > 0".to_string());
        }
        if !(self.rms_threshold > 0.0) {
            return Err("rms_threshold must be > 0".to_string());
        }
        if self.rms_frame_length == 0 || self.rms_hop_length == 0 {
            return Err("rms_frame_length and rms_hop_length must be > 0".to_string());
        }
        if self.rms_hop_length > self.rms_frame_length {
            return Err(format!(
                "rms_hop_length ({}) must not exceed rms_frame_length ({})",
                self.rms_hop_length, self.rms_frame_length
            ));
        }
        Ok(())
    }
}

/// Thresholds for the neural detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct NeuralDetectorConfig {
    /// Speech probability threshold (0.0-1.0).
    ///
    /// - Lower values (0.3-0.4): more sensitive, may count breathing as speech
    /// - Default (0.5): balanced
    /// - Higher values (0.6-0.7): only confident speech
    pub threshold: f32,

    /// Padding added to both sides of each speech interval (milliseconds).
    pub padding_ms: u64,

    /// Speech intervals separated by less than this are merged (milliseconds).
    pub min_silence_gap_ms: u64,

    /// Speech intervals shorter than this are discarded (milliseconds).
    pub min_speech_ms: u64,

    /// Tier assigned to every inter-speech gap.
    pub uniform_tier: PauseTier,
}

impl Default for NeuralDetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            padding_ms: 30,
            min_silence_gap_ms: 100,
            min_speech_ms: 100,
            uniform_tier: PauseTier::A,
        }
    }
}

impl NeuralDetectorConfig {
    /// Builder-style setter for the speech threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Builder-style setter for speech padding.
    pub fn with_padding_ms(mut self, ms: u64) -> Self {
        self.padding_ms = ms;
        self
    }

    /// Builder-style setter for the merge gap.
    pub fn with_min_silence_gap_ms(mut self, ms: u64) -> Self {
        self.min_silence_gap_ms = ms;
        self
    }

    fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(format!(
                "neural threshold must be within 0.0-1.0, got {}",
                self.threshold
            ));
        }
        Ok(())
    }
}

/// Joint duration/noise requirement for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TierRule {
    /// Minimum pause duration in seconds.
    pub min_duration_secs: f64,
    /// Noise standard deviation must be strictly below this.
    pub max_noise_std: f64,
}

impl TierRule {
    pub fn matches(&self, duration_secs: f64, noise_std: f64) -> bool {
        duration_secs >= self.min_duration_secs && noise_std < self.max_noise_std
    }
}

/// Tier thresholds, evaluated A then B then C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TierThresholds {
    pub a: TierRule,
    pub b: TierRule,
    pub c: TierRule,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            a: TierRule {
                min_duration_secs: 0.5,
                max_noise_std: 0.003,
            },
            b: TierRule {
                min_duration_secs: 0.2,
                max_noise_std: 0.007,
            },
            c: TierRule {
                min_duration_secs: 0.05,
                max_noise_std: 0.015,
            },
        }
    }
}

impl TierThresholds {
    /// Best tier whose rule matches, if any.
    pub fn tier_for(&self, duration_secs: f64, noise_std: f64) -> Option<PauseTier> {
        [
            (PauseTier::A, &self.a),
            (PauseTier::B, &self.b),
            (PauseTier::C, &self.c),
        ]
        .into_iter()
        .find(|(_, rule)| rule.matches(duration_secs, noise_std))
        .map(|(tier, _)| tier)
    }

    fn validate(&self) -> Result<(), String> {
        for (name, rule) in [("a", &self.a), ("b", &self.b), ("c", &self.c)] {
            if !(rule.min_duration_secs >= 0.0) || !(rule.max_noise_std > 0.0) {
                return Err(format!("tier {} thresholds must be non-negative", name));
            }
        }
        Ok(())
    }
}
