//! Energy-based quiet detection.
//!
//! A sample is quiet when both its absolute amplitude and the local RMS
//! energy fall below their thresholds. The raw mask is then cleaned up with
//! a binary erosion (removes dropouts inside speech) followed by a dilation
//! (restores the width of real pauses), and short runs are discarded.

use tracing::debug;
use vseg_models::{EnergyDetectorConfig, Interval};

use crate::loader::AudioBuffer;

/// Quiet-span detector driven by amplitude and RMS thresholds.
#[derive(Debug, Clone)]
pub struct EnergyDetector {
    config: EnergyDetectorConfig,
    min_silence_secs: f64,
}

impl EnergyDetector {
    pub fn new(config: EnergyDetectorConfig, min_silence_secs: f64) -> Self {
        Self {
            config,
            min_silence_secs,
        }
    }

    /// Sorted, disjoint quiet intervals of the buffer.
    pub fn quiet_intervals(&self, buffer: &AudioBuffer) -> Vec<Interval> {
        let samples = buffer.samples();
        let rate = buffer.sample_rate() as f64;
        if samples.is_empty() {
            return Vec::new();
        }

        let rms = frame_rms(
            samples,
            self.config.rms_frame_length,
            self.config.rms_hop_length,
        );
        let mask = quiet_mask(samples, &rms, &self.config);
        let raw = mask_runs(&mask);

        let erosion = (rate * self.config.erosion_ms as f64 / 1000.0) as usize;
        let dilation = (rate * self.config.dilation_ms as f64 / 1000.0) as usize;
        let smoothed = dilate(&erode(&raw, erosion), dilation, samples.len());

        let min_len = (self.min_silence_secs * rate).ceil() as usize;
        let quiet: Vec<Interval> = smoothed
            .into_iter()
            .filter(|iv| iv.len() >= min_len)
            .collect();

        debug!(
            raw_runs = raw.len(),
            quiet_intervals = quiet.len(),
            erosion_samples = erosion,
            dilation_samples = dilation,
            "Energy detection complete"
        );

        quiet
    }
}

/// RMS of centred, zero-padded frames; frame `t` is centred on sample `t * hop`.
pub(crate) fn frame_rms(samples: &[f32], frame_length: usize, hop_length: usize) -> Vec<f32> {
    let n = samples.len();
    let hop = hop_length.max(1);
    let frame = frame_length.max(1);
    let half = frame / 2;

    // Prefix sums of squares keep this linear in the signal length
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for s in samples {
        acc += (*s as f64) * (*s as f64);
        prefix.push(acc);
    }

    let n_frames = 1 + n / hop;
    (0..n_frames)
        .map(|t| {
            let center = t * hop;
            let start = center.saturating_sub(half).min(n);
            let end = (center + frame - half).min(n);
            let energy = prefix[end] - prefix[start];
            (energy / frame as f64).sqrt() as f32
        })
        .collect()
}

/// Frame RMS linearly interpolated at `index`, clamped past the last frame.
fn rms_at(rms: &[f32], hop: usize, index: usize) -> f32 {
    let j = index / hop;
    if j + 1 >= rms.len() {
        return rms[rms.len() - 1];
    }
    let frac = (index - j * hop) as f32 / hop as f32;
    rms[j] + (rms[j + 1] - rms[j]) * frac
}

fn quiet_mask(samples: &[f32], rms: &[f32], config: &EnergyDetectorConfig) -> Vec<bool> {
    let hop = config.rms_hop_length.max(1);
    samples
        .iter()
        .enumerate()
        .map(|(i, s)| {
            s.abs() < config.amplitude_threshold && rms_at(rms, hop, i) < config.rms_threshold
        })
        .collect()
}

/// Runs of `true` in a mask as intervals.
pub(crate) fn mask_runs(mask: &[bool]) -> Vec<Interval> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (i, quiet) in mask.iter().enumerate() {
        match (start, *quiet) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                runs.extend(Interval::new(s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.extend(Interval::new(s, mask.len()));
    }

    runs
}

/// Shrink every run by `k` samples per side; samples outside the signal count as loud.
pub(crate) fn erode(runs: &[Interval], k: usize) -> Vec<Interval> {
    runs.iter()
        .filter_map(|iv| Interval::new(iv.start + k, iv.end.saturating_sub(k)))
        .collect()
}

/// Grow every run by `k` samples per side, clip to `[0, total)` and merge overlaps.
pub(crate) fn dilate(runs: &[Interval], k: usize, total: usize) -> Vec<Interval> {
    let mut out: Vec<Interval> = Vec::with_capacity(runs.len());

    for iv in runs {
        let start = iv.start.saturating_sub(k);
        let end = (iv.end + k).min(total);
        match out.last_mut() {
            Some(last) if start <= last.end => last.end = last.end.max(end),
            _ => out.extend(Interval::new(start, end)),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16_000;

    fn iv(start: usize, end: usize) -> Interval {
        Interval::new(start, end).unwrap()
    }

    /// Loud square-ish tone with exact digital silence at the given spans (seconds).
    fn signal_with_gaps(total_secs: f64, gaps: &[(f64, f64)]) -> AudioBuffer {
        let n = (total_secs * RATE as f64) as usize;
        let samples = (0..n)
            .map(|i| {
                let t = i as f64 / RATE as f64;
                if gaps.iter().any(|(a, b)| t >= *a && t < *b) {
                    0.0
                } else {
                    (2.0 * std::f64::consts::PI * 220.0 * t).sin() as f32 * 0.5
                }
            })
            .collect();
        AudioBuffer::new(samples, RATE)
    }

    #[test]
    fn test_mask_runs() {
        let mask = [true, true, false, false, true, false, true];
        assert_eq!(mask_runs(&mask), vec![iv(0, 2), iv(4, 5), iv(6, 7)]);
        assert!(mask_runs(&[false, false]).is_empty());
    }

    #[test]
    fn test_erode_drops_short_runs_and_shrinks_edges() {
        let runs = vec![iv(0, 10), iv(20, 23), iv(30, 50)];
        assert_eq!(erode(&runs, 2), vec![iv(2, 8), iv(32, 48)]);
    }

    #[test]
    fn test_dilate_merges_and_clips() {
        let runs = vec![iv(2, 8), iv(12, 20), iv(95, 98)];
        assert_eq!(dilate(&runs, 3, 100), vec![iv(0, 23), iv(92, 100)]);
    }

    #[test]
    fn test_frame_rms_constant_signal() {
        let samples = vec![0.5f32; 4096];
        let rms = frame_rms(&samples, 1024, 512);
        assert_eq!(rms.len(), 1 + 4096 / 512);
        // Edge frames are half zero-padded
        assert!((rms[0] - (0.125f32).sqrt()).abs() < 1e-4);
        assert!((rms[4] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_detects_gap_near_expected_position() {
        let buffer = signal_with_gaps(4.0, &[(1.5, 2.0)]);
        let detector = EnergyDetector::new(EnergyDetectorConfig::default(), 0.05);
        let quiet = detector.quiet_intervals(&buffer);

        assert_eq!(quiet.len(), 1);
        let gap = quiet[0];
        let midpoint_secs = gap.midpoint() as f64 / RATE as f64;
        assert!((midpoint_secs - 1.75).abs() < 0.05, "midpoint {}", midpoint_secs);
        assert!(gap.duration_secs(RATE) > 0.3);
    }

    #[test]
    fn test_short_dropout_is_ignored() {
        // 10ms of zeros is shorter than twice the erosion margin
        let buffer = signal_with_gaps(2.0, &[(1.0, 1.01)]);
        let detector = EnergyDetector::new(EnergyDetectorConfig::default(), 0.05);
        assert!(detector.quiet_intervals(&buffer).is_empty());
    }

    #[test]
    fn test_all_silent_signal() {
        let buffer = AudioBuffer::new(vec![0.0; RATE as usize * 2], RATE);
        let detector = EnergyDetector::new(EnergyDetectorConfig::default(), 0.05);
        let quiet = detector.quiet_intervals(&buffer);
        // Erosion then dilation restores the full span
        assert_eq!(quiet, vec![iv(0, RATE as usize * 2)]);
    }
}
