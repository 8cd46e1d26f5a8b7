//! Summary statistics over a segment list.

use vseg_models::{PlannedSegment, SegmentStats};

/// Tolerance when comparing durations against the length bounds.
const DURATION_EPSILON: f64 = 1e-9;

/// Count segments inside/below/above `[min_length, max_length]` and summarise durations.
pub fn compute_segment_stats(
    segments: &[PlannedSegment],
    sample_rate: u32,
    min_length: f64,
    max_length: f64,
) -> SegmentStats {
    if segments.is_empty() {
        return SegmentStats::default();
    }

    let durations: Vec<f64> = segments
        .iter()
        .map(|s| s.duration_secs(sample_rate))
        .collect();

    let too_short = durations
        .iter()
        .filter(|d| **d < min_length - DURATION_EPSILON)
        .count();
    let too_long = durations
        .iter()
        .filter(|d| **d > max_length + DURATION_EPSILON)
        .count();
    let total = durations.len();
    let in_range = total - too_short - too_long;

    SegmentStats {
        total_segments: total,
        in_range,
        too_short,
        too_long,
        success_rate: in_range as f64 / total as f64,
        avg_duration: durations.iter().sum::<f64>() / total as f64,
        min_duration: durations.iter().copied().fold(f64::INFINITY, f64::min),
        max_duration: durations.iter().copied().fold(0.0, f64::max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let stats = compute_segment_stats(&[], 16_000, 5.0, 15.0);
        assert_eq!(stats, SegmentStats::default());
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn test_counts_and_durations() {
        let segments = vec![
            PlannedSegment::new(0, 3_000),       // 3s, too short
            PlannedSegment::new(3_000, 8_000),   // 5s, exactly min
            PlannedSegment::new(8_000, 18_000),  // 10s
            PlannedSegment::new(18_000, 38_000), // 20s, too long
        ];
        let stats = compute_segment_stats(&segments, 1_000, 5.0, 15.0);

        assert_eq!(stats.total_segments, 4);
        assert_eq!(stats.in_range, 2);
        assert_eq!(stats.too_short, 1);
        assert_eq!(stats.too_long, 1);
        assert!((stats.success_rate - 0.5).abs() < 1e-9);
        assert!((stats.avg_duration - 9.5).abs() < 1e-9);
        assert!((stats.min_duration - 3.0).abs() < 1e-9);
        assert!((stats.max_duration - 20.0).abs() < 1e-9);
    }
}
