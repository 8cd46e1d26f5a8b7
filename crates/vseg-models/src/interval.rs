//! Half-open sample intervals.
//!
//! Quiet and active spans are both expressed as `[start, end)` ranges in
//! sample units. Lists of one kind are kept sorted by `start` and pairwise
//! disjoint, which lets callers convert between the two with [`complement`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` range of samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Interval {
    /// First sample (inclusive)
    pub start: usize,
    /// Last sample (exclusive)
    pub end: usize,
}

impl Interval {
    /// Create an interval, returning `None` when `start >= end`.
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Number of samples covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True for a degenerate interval (never produced by [`Interval::new`]).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at the temporal midpoint (rounded down).
    pub fn midpoint(&self) -> usize {
        self.start + self.len() / 2
    }

    /// Duration in seconds at the given sample rate.
    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.len() as f64 / sample_rate as f64
    }

    /// Start time in seconds.
    pub fn start_secs(&self, sample_rate: u32) -> f64 {
        self.start as f64 / sample_rate as f64
    }

    /// End time in seconds.
    pub fn end_secs(&self, sample_rate: u32) -> f64 {
        self.end as f64 / sample_rate as f64
    }

    /// Whether `sample` falls inside the interval.
    pub fn contains(&self, sample: usize) -> bool {
        sample >= self.start && sample < self.end
    }

    /// Whether two intervals share at least one sample.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Complement of a sorted, disjoint interval list over `[0, total)`.
///
/// Intervals extending past `total` are clipped.
pub fn complement(intervals: &[Interval], total: usize) -> Vec<Interval> {
    let mut gaps = Vec::with_capacity(intervals.len() + 1);
    let mut cursor = 0usize;

    for interval in intervals {
        let start = interval.start.min(total);
        if let Some(gap) = Interval::new(cursor, start) {
            gaps.push(gap);
        }
        cursor = cursor.max(interval.end.min(total));
    }

    if let Some(tail) = Interval::new(cursor, total) {
        gaps.push(tail);
    }

    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: usize, end: usize) -> Interval {
        Interval::new(start, end).unwrap()
    }

    #[test]
    fn test_new_rejects_degenerate() {
        assert!(Interval::new(5, 5).is_none());
        assert!(Interval::new(6, 5).is_none());
        assert_eq!(Interval::new(0, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_midpoint_and_duration() {
        let interval = iv(16_000, 24_000);
        assert_eq!(interval.midpoint(), 20_000);
        assert!((interval.duration_secs(16_000) - 0.5).abs() < 1e-9);
        assert!((interval.start_secs(16_000) - 1.0).abs() < 1e-9);
        assert!((interval.end_secs(16_000) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_contains_is_half_open() {
        let interval = iv(10, 20);
        assert!(interval.contains(10));
        assert!(interval.contains(19));
        assert!(!interval.contains(20));
    }

    #[test]
    fn test_overlaps() {
        assert!(iv(0, 10).overlaps(&iv(9, 12)));
        assert!(!iv(0, 10).overlaps(&iv(10, 12)));
    }

    #[test]
    fn test_complement_interior() {
        let gaps = complement(&[iv(10, 20), iv(30, 40)], 50);
        assert_eq!(gaps, vec![iv(0, 10), iv(20, 30), iv(40, 50)]);
    }

    #[test]
    fn test_complement_touching_edges() {
        let gaps = complement(&[iv(0, 20), iv(30, 50)], 50);
        assert_eq!(gaps, vec![iv(20, 30)]);
    }

    #[test]
    fn test_complement_of_nothing_is_everything() {
        assert_eq!(complement(&[], 100), vec![iv(0, 100)]);
        assert!(complement(&[iv(0, 100)], 100).is_empty());
    }

    #[test]
    fn test_complement_clips_past_total() {
        let gaps = complement(&[iv(10, 200)], 100);
        assert_eq!(gaps, vec![iv(0, 10)]);
    }
}
