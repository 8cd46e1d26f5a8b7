//! End-to-end segmentation tests over synthesized WAV recordings.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use vseg_media::{NoopProgress, SegmentationEngine, SpeechScorer, VadError};
use vseg_models::{
    DetectorConfig, ErrorKind, JobId, NeuralDetectorConfig, SegmentationConfig,
    SegmentationResult, SegmentationStatus,
};

const RATE: u32 = 16_000;

/// A tone of `total_secs` with digital silence over each `(start, end)` span.
fn synth(total_secs: f64, silences: &[(f64, f64)]) -> Vec<f32> {
    synth_at(RATE, total_secs, silences)
}

fn synth_at(rate: u32, total_secs: f64, silences: &[(f64, f64)]) -> Vec<f32> {
    let n = (total_secs * rate as f64).round() as usize;
    (0..n)
        .map(|i| {
            let t = i as f64 / rate as f64;
            if silences.iter().any(|(s, e)| t >= *s && t < *e) {
                0.0
            } else {
                ((2.0 * std::f64::consts::PI * 220.0 * t).sin() * 0.3) as f32
            }
        })
        .collect()
}

fn write_wav(path: &Path, samples: &[f32]) {
    write_wav_at(path, RATE, samples);
}

fn write_wav_at(path: &Path, rate: u32, samples: &[f32]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for s in samples {
        writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

const FIXTURE_SILENCES: [(f64, f64); 2] = [(9.8, 10.3), (19.5, 19.8)];

fn twenty_second_fixture(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("talk.wav");
    write_wav(&path, &synth(20.0, &FIXTURE_SILENCES));
    path
}

/// Scores a 16kHz frame as speech when any sample exceeds 0.05.
struct AmplitudeScorer {
    resets: Arc<AtomicUsize>,
}

impl SpeechScorer for AmplitudeScorer {
    fn sample_rate(&self) -> usize {
        RATE as usize
    }

    fn frame_size(&self) -> usize {
        512
    }

    fn frame_probabilities(&mut self, samples: &[f32]) -> Vec<f32> {
        samples
            .chunks_exact(512)
            .map(|frame| {
                if frame.iter().any(|s| s.abs() > 0.05) {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn reset(&mut self) -> Result<(), VadError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn neural_engine() -> (SegmentationEngine, Arc<AtomicUsize>) {
    let resets = Arc::new(AtomicUsize::new(0));
    let scorer = AmplitudeScorer {
        resets: Arc::clone(&resets),
    };
    (SegmentationEngine::with_speech_scorer(Box::new(scorer)), resets)
}

fn neural_config() -> SegmentationConfig {
    SegmentationConfig::neural()
        .with_lengths(5.0, 12.0)
        .with_allow_short_final(true)
}

async fn segment(input: &Path, output: &Path, config: &SegmentationConfig) -> SegmentationResult {
    SegmentationEngine::new()
        .run(JobId::new(), input, output, config, Arc::new(NoopProgress))
        .await
}

fn wav_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| n.ends_with(".wav"))
        .collect();
    names.sort();
    names
}

fn assert_near(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} within {} of {}",
        actual,
        tolerance,
        expected
    );
}

#[tokio::test]
async fn test_cuts_at_pauses_and_merges_short_tail() {
    let dir = TempDir::new().unwrap();
    let input = twenty_second_fixture(&dir);
    let output = dir.path().join("out");

    let config = SegmentationConfig::default().with_lengths(5.0, 12.0);
    let result = segment(&input, &output, &config).await;

    assert_eq!(result.status, SegmentationStatus::Success, "{}", result.message);
    assert_eq!(result.segments.len(), 2);
    assert_near(result.segments[0].start, 0.0, 1e-9);
    assert_near(result.segments[0].end, 10.05, 0.1);
    // The 0.35s remainder after the 19.65s cut joins the previous segment
    assert_near(result.segments[1].end, 20.0, 1e-9);
    assert_eq!(result.segments_written, 2);
    assert_eq!(wav_files(&output), vec!["segment_0001.wav", "segment_0002.wav"]);
    assert_eq!(result.message, "Created 2 segments");
    assert_near(result.source_duration, 20.0, 1e-3);
}

#[tokio::test]
async fn test_short_final_kept_when_allowed() {
    let dir = TempDir::new().unwrap();
    let input = twenty_second_fixture(&dir);
    let output = dir.path().join("out");

    let config = SegmentationConfig::default()
        .with_lengths(5.0, 12.0)
        .with_allow_short_final(true);
    let result = segment(&input, &output, &config).await;

    assert_eq!(result.status, SegmentationStatus::Success, "{}", result.message);
    assert_eq!(result.segments.len(), 3);
    assert_near(result.segments[0].end, 10.05, 0.1);
    assert_near(result.segments[1].end, 19.65, 0.1);
    assert_near(result.segments[2].end, 20.0, 1e-9);
    assert!(result.segments[2].duration < 5.0);

    // Contiguous segments cover every source sample
    let total: u32 = wav_files(&output)
        .iter()
        .map(|name| hound::WavReader::open(output.join(name)).unwrap().len())
        .sum();
    assert_eq!(total, 20 * RATE);
}

#[tokio::test]
async fn test_segments_are_ordered_and_bounded() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("long.wav");
    let silences: Vec<(f64, f64)> = (1..12)
        .map(|k| {
            let at = k as f64 * 4.7;
            (at, at + 0.4)
        })
        .collect();
    write_wav(&input, &synth(56.0, &silences));

    let config = SegmentationConfig::default().with_lengths(5.0, 12.0);
    let result = segment(&input, &dir.path().join("out"), &config).await;
    assert_eq!(result.status, SegmentationStatus::Success, "{}", result.message);

    let segments = &result.segments;
    assert!(!segments.is_empty());
    for pair in segments.windows(2) {
        assert!(pair[0].end_sample <= pair[1].start_sample);
        assert!(pair[0].start_sample < pair[1].start_sample);
    }
    for seg in segments {
        assert!(seg.start_sample < seg.end_sample);
        assert!(seg.duration >= 5.0 - 1e-6, "segment too short: {:?}", seg);
        assert!(seg.duration <= 12.0 + 1e-6, "segment too long: {:?}", seg);
    }
    assert_eq!(result.stats.total_segments, segments.len());
    assert_eq!(result.stats.in_range, segments.len());
    assert_near(result.stats.success_rate, 1.0, 1e-9);
}

#[tokio::test]
async fn test_signal_shorter_than_min_length_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("short.wav");
    write_wav(&input, &synth(3.0, &[]));

    let config = SegmentationConfig::default().with_lengths(5.0, 12.0);
    let result = segment(&input, &dir.path().join("out"), &config).await;

    assert_eq!(result.status, SegmentationStatus::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::NoValidSegments));
    assert!(result.segments.is_empty());
}

#[tokio::test]
async fn test_silent_recording_is_warning() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("quiet.wav");
    write_wav(&input, &vec![0.0; 10 * RATE as usize]);

    let output = dir.path().join("out");
    let result = segment(&input, &output, &SegmentationConfig::default()).await;

    assert_eq!(result.status, SegmentationStatus::Warning);
    assert!(result.segments.is_empty());
    assert_eq!(result.segments_written, 0);
    assert!(!output.join("segment_0001.wav").exists());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let input = twenty_second_fixture(&dir);
    let output = dir.path().join("out");
    let config = SegmentationConfig::default().with_lengths(5.0, 12.0);

    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("stale.wav"), b"stale").unwrap();

    let engine = SegmentationEngine::new();
    let first = engine
        .run(JobId::new(), &input, &output, &config, Arc::new(NoopProgress))
        .await;
    let first_files = wav_files(&output);
    let second = engine
        .run(JobId::new(), &input, &output, &config, Arc::new(NoopProgress))
        .await;

    assert_eq!(first.segments, second.segments);
    assert_eq!(first.stats, second.stats);
    assert_eq!(first_files, wav_files(&output));
    assert!(!output.join("stale.wav").exists());
    assert_eq!(engine.runs_started(), 2);
    assert_eq!(engine.runs_failed(), 0);
}

#[tokio::test]
async fn test_file_prefix_is_applied() {
    let dir = TempDir::new().unwrap();
    let input = twenty_second_fixture(&dir);
    let output = dir.path().join("out");

    let config = SegmentationConfig::default()
        .with_lengths(5.0, 12.0)
        .with_file_prefix("talk");
    let result = segment(&input, &output, &config).await;

    assert_eq!(
        result.segments[0].file_name.as_deref(),
        Some("talk_segment_0001.wav")
    );
    assert_eq!(
        wav_files(&output),
        vec!["talk_segment_0001.wav", "talk_segment_0002.wav"]
    );
}

#[tokio::test]
async fn test_neural_cuts_at_pauses() {
    let dir = TempDir::new().unwrap();
    let input = twenty_second_fixture(&dir);
    let output = dir.path().join("out");

    let (engine, resets) = neural_engine();
    let result = engine
        .run(JobId::new(), &input, &output, &neural_config(), Arc::new(NoopProgress))
        .await;

    assert_eq!(result.status, SegmentationStatus::Success, "{}", result.message);
    assert_eq!(result.segments.len(), 3);
    assert_near(result.segments[0].end, 10.05, 0.1);
    assert_near(result.segments[1].end, 19.65, 0.1);
    assert_near(result.segments[2].end, 20.0, 1e-9);
    assert_eq!(wav_files(&output).len(), 3);
    assert_eq!(result.sample_rate, RATE);
    assert_eq!(resets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_neural_resamples_and_reuses_scorer() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("talk_22k.wav");
    write_wav_at(&input, 22_050, &synth_at(22_050, 20.0, &FIXTURE_SILENCES));
    let output = dir.path().join("out");

    let (engine, resets) = neural_engine();
    let first = engine
        .run(JobId::new(), &input, &output, &neural_config(), Arc::new(NoopProgress))
        .await;
    let second = engine
        .run(JobId::new(), &input, &output, &neural_config(), Arc::new(NoopProgress))
        .await;

    assert_eq!(first.status, SegmentationStatus::Success, "{}", first.message);
    assert_eq!(first.sample_rate, RATE);
    assert_eq!(first.segments.len(), 3);
    assert_near(first.segments[0].end, 10.05, 0.1);
    assert_near(first.segments[1].end, 19.65, 0.1);
    assert_eq!(first.segments, second.segments);
    // Reset before each run, never replaced by a fresh model
    assert_eq!(resets.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_neural_merge_gap_swallows_short_pauses() {
    let dir = TempDir::new().unwrap();
    let input = twenty_second_fixture(&dir);
    let output = dir.path().join("out");

    // A 600ms merge gap joins the speech around both pauses
    let config = neural_config().with_detector(DetectorConfig::Neural(
        NeuralDetectorConfig::default().with_min_silence_gap_ms(600),
    ));
    let (engine, _) = neural_engine();
    let result = engine
        .run(JobId::new(), &input, &output, &config, Arc::new(NoopProgress))
        .await;

    assert_eq!(result.status, SegmentationStatus::Success, "{}", result.message);
    assert_near(result.segments[0].end, 12.0, 1e-3);
}
