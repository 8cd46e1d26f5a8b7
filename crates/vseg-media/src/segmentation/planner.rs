//! Greedy boundary planning.
//!
//! The planner walks forward from a cursor. For each step it opens a search
//! window `[cursor + min, cursor + max + extension]`, cuts at the midpoint of
//! the best pause inside it, and moves the cursor to the cut. Tier decides
//! between candidates; ties go to the candidate closest to the window centre.

use tracing::{debug, warn};
use vseg_models::{ClassifiedPause, FallbackPolicy, PlannedSegment, SegmentationConfig};

use crate::error::{MediaError, MediaResult};

/// Planner parameters in sample units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerParams {
    pub sample_rate: u32,
    pub min_samples: usize,
    pub max_samples: usize,
    pub extension_samples: usize,
    pub allow_short_final: bool,
    pub fallback: FallbackPolicy,
    /// Smallest step the cursor may take (1ms of samples, at least 1).
    pub epsilon: usize,
}

impl PlannerParams {
    /// Convert the second-based configuration to samples at `sample_rate`.
    pub fn from_config(config: &SegmentationConfig, sample_rate: u32) -> Self {
        let to_samples = |secs: f64| (secs.max(0.0) * sample_rate as f64).round() as usize;
        Self {
            sample_rate,
            min_samples: to_samples(config.min_length),
            max_samples: to_samples(config.max_length),
            extension_samples: to_samples(config.max_extension),
            allow_short_final: config.allow_short_final,
            fallback: config.fallback,
            epsilon: (sample_rate as usize / 1000).max(1),
        }
    }

    fn secs(&self, samples: usize) -> f64 {
        samples as f64 / self.sample_rate as f64
    }
}

/// Choose segment boundaries for a signal of `total` samples.
///
/// `pauses` must be sorted by start and disjoint.
pub fn plan_segments(
    pauses: &[ClassifiedPause],
    total: usize,
    params: &PlannerParams,
) -> MediaResult<Vec<PlannedSegment>> {
    if params.fallback == FallbackPolicy::NextPause && pauses.is_empty() {
        return Err(MediaError::NoUsablePauses);
    }
    let unordered = pauses.windows(2).any(|w| {
        w[1].interval.start < w[0].interval.start || w[0].interval.overlaps(&w[1].interval)
    });
    if unordered {
        return Err(MediaError::internal("Pauses must be sorted and disjoint"));
    }

    let mut segments: Vec<PlannedSegment> = Vec::new();
    let mut cursor = 0usize;
    // Index of the first pause not yet retired
    let mut next_pause = 0usize;
    let mut hard_cuts = 0usize;

    while cursor < total {
        let remaining = total - cursor;
        if remaining < params.min_samples {
            finish_short_remainder(&mut segments, cursor, total, params)?;
            break;
        }

        let search_start = cursor + params.min_samples;
        let search_end = (cursor + params.max_samples + params.extension_samples).min(total);
        let open = &pauses[next_pause..];

        let mut cut = match best_candidate(open, search_start, search_end) {
            Some(pause) => pause.cut_point(),
            None => {
                let fallback_cut = match params.fallback {
                    FallbackPolicy::HardCut => None,
                    FallbackPolicy::NextPause => open
                        .iter()
                        .map(ClassifiedPause::cut_point)
                        .find(|m| *m > cursor),
                };
                fallback_cut.unwrap_or_else(|| {
                    if search_end < total {
                        hard_cuts += 1;
                    }
                    search_end
                })
            }
        };

        if cut < cursor + params.epsilon {
            cut = (cursor + params.epsilon).min(total);
        }

        segments.push(PlannedSegment::new(cursor, cut));
        cursor = cut;

        while next_pause < pauses.len() && pauses[next_pause].interval.end <= cut {
            next_pause += 1;
        }
    }

    if hard_cuts > 0 {
        warn!(hard_cuts, "No pause found in some search windows, cut without a pause");
    }
    debug!(
        segments = segments.len(),
        pauses = pauses.len(),
        total_secs = format!("{:.2}", params.secs(total)),
        "Boundary planning complete"
    );

    Ok(segments)
}

/// Highest tier with a midpoint in `[start, end]`; ties go to the midpoint
/// closest to the window centre, then to the earlier one.
fn best_candidate(pauses: &[ClassifiedPause], start: usize, end: usize) -> Option<&ClassifiedPause> {
    // Twice the centre keeps the distance integral
    let centre2 = start + end;
    let distance = |p: &ClassifiedPause| (2 * p.cut_point()).abs_diff(centre2);

    let mut best: Option<&ClassifiedPause> = None;
    for pause in pauses {
        let mid = pause.cut_point();
        if mid > end {
            break;
        }
        if mid < start {
            continue;
        }
        best = match best {
            None => Some(pause),
            Some(current) => {
                let better_tier = pause.tier.priority() > current.tier.priority();
                let same_tier_closer = pause.tier == current.tier && distance(pause) < distance(current);
                if better_tier || same_tier_closer {
                    Some(pause)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}

fn finish_short_remainder(
    segments: &mut Vec<PlannedSegment>,
    cursor: usize,
    total: usize,
    params: &PlannerParams,
) -> MediaResult<()> {
    if params.allow_short_final {
        segments.push(PlannedSegment::new(cursor, total));
        return Ok(());
    }

    match segments.last_mut() {
        Some(last) if total - last.start <= params.max_samples => {
            debug!(
                tail_secs = format!("{:.3}", params.secs(total - cursor)),
                "Merging short tail into previous segment"
            );
            last.end = total;
        }
        Some(_) => {
            debug!(
                tail_secs = format!("{:.3}", params.secs(total - cursor)),
                "Dropping short tail"
            );
        }
        None => {
            return Err(MediaError::NoValidSegments {
                duration: params.secs(total),
                min_length: params.secs(params.min_samples),
            });
        }
    }
    Ok(())
}
