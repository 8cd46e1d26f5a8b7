//! Pause tier classification.

use tracing::debug;
use vseg_models::{ClassifiedPause, Interval, PauseTier, TierThresholds};

use crate::loader::AudioBuffer;

/// Score quiet spans into tiers by duration and noise floor.
///
/// Spans matching no tier are dropped. Output keeps the input order.
pub fn classify_pauses(
    quiet: &[Interval],
    buffer: &AudioBuffer,
    tiers: &TierThresholds,
) -> Vec<ClassifiedPause> {
    let rate = buffer.sample_rate();
    let mut dropped = 0usize;

    let pauses: Vec<ClassifiedPause> = quiet
        .iter()
        .filter_map(|interval| {
            let duration_secs = interval.duration_secs(rate);
            let noise_level = std_dev(buffer.slice(interval.start, interval.end));

            match tiers.tier_for(duration_secs, noise_level) {
                Some(tier) => Some(ClassifiedPause {
                    interval: *interval,
                    tier,
                    duration_secs,
                    noise_level,
                }),
                None => {
                    dropped += 1;
                    None
                }
            }
        })
        .collect();

    debug!(
        candidates = quiet.len(),
        pauses = pauses.len(),
        dropped,
        tier_a = count_tier(&pauses, PauseTier::A),
        tier_b = count_tier(&pauses, PauseTier::B),
        tier_c = count_tier(&pauses, PauseTier::C),
        "Pause classification complete"
    );

    pauses
}

/// Give every quiet span the same tier, without noise analysis.
pub fn uniform_pauses(quiet: &[Interval], sample_rate: u32, tier: PauseTier) -> Vec<ClassifiedPause> {
    quiet
        .iter()
        .map(|interval| ClassifiedPause {
            interval: *interval,
            tier,
            duration_secs: interval.duration_secs(sample_rate),
            noise_level: 0.0,
        })
        .collect()
}

fn count_tier(pauses: &[ClassifiedPause], tier: PauseTier) -> usize {
    pauses.iter().filter(|p| p.tier == tier).count()
}

/// Population standard deviation.
pub(crate) fn std_dev(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|s| *s as f64).sum::<f64>() / n;
    let variance = samples
        .iter()
        .map(|s| {
            let d = *s as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    variance.sqrt()
}
