//! Post-planning segment cleanup.
//!
//! One forward pass merges undersized segments into their successor when the
//! union still fits, and splits oversized ones at their midpoint. Segments
//! still shorter than the minimum afterwards are dropped.

use tracing::debug;
use vseg_models::PlannedSegment;

use super::planner::PlannerParams;

/// Merge, split and filter planned segments.
pub fn optimize_segments(segments: &[PlannedSegment], params: &PlannerParams) -> Vec<PlannedSegment> {
    let mut passed: Vec<PlannedSegment> = Vec::with_capacity(segments.len() + 1);
    let mut merged = 0usize;
    let mut split = 0usize;

    let mut i = 0;
    while i < segments.len() {
        let current = segments[i];

        if current.len() < params.min_samples {
            if let Some(next) = segments.get(i + 1) {
                if next.end - current.start <= params.max_samples {
                    passed.push(PlannedSegment::new(current.start, next.end));
                    merged += 1;
                    i += 2;
                    continue;
                }
            }
        }

        if current.len() > params.max_samples {
            let mid = current.midpoint();
            passed.push(PlannedSegment::new(current.start, mid));
            passed.push(PlannedSegment::new(mid, current.end));
            split += 1;
        } else {
            passed.push(current);
        }
        i += 1;
    }

    let last = passed.len().saturating_sub(1);
    let optimized: Vec<PlannedSegment> = passed
        .into_iter()
        .enumerate()
        .filter(|(idx, seg)| {
            !seg.is_empty()
                && (seg.len() >= params.min_samples || (params.allow_short_final && *idx == last))
        })
        .map(|(_, seg)| seg)
        .collect();

    debug!(
        input = segments.len(),
        output = optimized.len(),
        merged,
        split,
        "Segment optimization complete"
    );

    optimized
}
