//! Pause tiers and classified pauses.
//!
//! Every quiet interval that survives detection is scored into a tier:
//!
//! - `A`: long, near-digital silence (highest confidence cut point)
//! - `B`: medium pause with a low noise floor
//! - `C`: short or slightly noisy pause, used when nothing better exists
//!
//! Tiers only break ties between candidates inside the planner's search
//! window; they never reorder candidates in time.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::Interval;

/// Confidence tier for a candidate cut point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum PauseTier {
    /// Long, clean silence.
    #[default]
    A,
    /// Medium pause with a low noise floor.
    B,
    /// Short or noisier pause.
    C,
}

impl PauseTier {
    /// All tiers, best first.
    pub const ALL: &'static [PauseTier] = &[PauseTier::A, PauseTier::B, PauseTier::C];

    /// Returns the tier name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PauseTier::A => "A",
            PauseTier::B => "B",
            PauseTier::C => "C",
        }
    }

    /// Planner priority (higher wins).
    pub fn priority(&self) -> u8 {
        match self {
            PauseTier::A => 3,
            PauseTier::B => 2,
            PauseTier::C => 1,
        }
    }
}

impl fmt::Display for PauseTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PauseTier {
    type Err = PauseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(PauseTier::A),
            "B" => Ok(PauseTier::B),
            "C" => Ok(PauseTier::C),
            _ => Err(PauseTierError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown pause tier: {0}")]
pub struct PauseTierError(String);

/// A quiet interval that qualified as a cut candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassifiedPause {
    /// Quiet span in samples
    pub interval: Interval,
    /// Assigned tier
    pub tier: PauseTier,
    /// Duration of the span in seconds
    pub duration_secs: f64,
    /// Standard deviation of the samples inside the span
    pub noise_level: f64,
}

impl ClassifiedPause {
    /// Candidate cut point (midpoint of the quiet span).
    pub fn cut_point(&self) -> usize {
        self.interval.midpoint()
    }
}
