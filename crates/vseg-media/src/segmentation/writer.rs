//! Segment artifact writing.
//!
//! Each non-silent segment becomes a mono 16-bit PCM WAV file named
//! `segment_0001.wav`, `segment_0002.wav`, ... (or `<prefix>_segment_0001.wav`).
//! Files are written in parallel; a failed write is logged and counted but
//! does not stop the others. Once the run is cancelled no new file is
//! started.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, warn};
use vseg_models::{PlannedSegment, ProcessingStage, SegmentBoundary};

use crate::cancel::CancelToken;
use crate::error::MediaResult;
use crate::loader::AudioBuffer;
use crate::progress::ProgressReporter;

/// Outcome of writing a segment list.
#[derive(Debug, Clone, Default)]
pub struct WriteOutcome {
    /// Every input segment, with `file_name` set when an artifact was written
    pub boundaries: Vec<SegmentBoundary>,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Files never started because the run was cancelled
    pub cancelled: usize,
}

impl WriteOutcome {
    /// Names of the files that were written.
    pub fn written_files(&self) -> impl Iterator<Item = &str> {
        self.boundaries
            .iter()
            .filter_map(|b| b.file_name.as_deref())
    }
}

enum FileWrite {
    Written(String),
    Failed,
    Cancelled,
}

/// Create the output directory, optionally removing files already in it.
pub async fn prepare_output_dir(dir: &Path, clear: bool) -> MediaResult<()> {
    tokio::fs::create_dir_all(dir).await?;

    if clear {
        let mut removed = 0usize;
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                tokio::fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(dir = %dir.display(), removed, "Cleared output directory");
        }
    }

    Ok(())
}

/// Artifact file name for the `number`-th written segment (1-based).
pub fn segment_file_name(number: usize, prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}_segment_{:04}.wav", prefix, number),
        _ => format!("segment_{:04}.wav", number),
    }
}

/// Write every non-silent segment of `buffer` into `output_dir`.
pub fn write_segments(
    buffer: &AudioBuffer,
    segments: &[PlannedSegment],
    output_dir: &Path,
    file_prefix: Option<&str>,
    progress: &ProgressReporter,
    cancel: &CancelToken,
) -> WriteOutcome {
    let rate = buffer.sample_rate();
    let mut boundaries: Vec<SegmentBoundary> = segments
        .iter()
        .enumerate()
        .map(|(i, seg)| SegmentBoundary::from_planned(i + 1, seg, rate))
        .collect();

    // Number artifacts over the segments that carry any signal
    let mut jobs: Vec<(usize, PathBuf)> = Vec::with_capacity(segments.len());
    let mut skipped = 0usize;
    for (i, seg) in segments.iter().enumerate() {
        if is_silent(buffer.slice(seg.start, seg.end)) {
            warn!(
                index = i + 1,
                start = format!("{:.3}", boundaries[i].start),
                end = format!("{:.3}", boundaries[i].end),
                "Skipping empty or silent segment"
            );
            skipped += 1;
            continue;
        }
        let name = segment_file_name(jobs.len() + 1, file_prefix);
        jobs.push((i, output_dir.join(name)));
    }

    let total_jobs = jobs.len();
    let finished = AtomicUsize::new(0);

    let results: Vec<(usize, FileWrite)> = jobs
        .par_iter()
        .map(|(i, path)| {
            if cancel.is_cancelled() {
                return (*i, FileWrite::Cancelled);
            }
            let seg = segments[*i];
            let result = write_wav(path, buffer.slice(seg.start, seg.end), rate);

            let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
            progress.stage(ProcessingStage::Write, done as f64 / total_jobs as f64);

            match result {
                Ok(()) => match file_name_of(path) {
                    Some(name) => (*i, FileWrite::Written(name)),
                    None => (*i, FileWrite::Failed),
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to write segment");
                    (*i, FileWrite::Failed)
                }
            }
        })
        .collect();

    let mut written = 0usize;
    let mut failed = 0usize;
    let mut cancelled = 0usize;
    for (i, result) in results {
        match result {
            FileWrite::Written(name) => {
                boundaries[i].file_name = Some(name);
                written += 1;
            }
            FileWrite::Failed => failed += 1,
            FileWrite::Cancelled => cancelled += 1,
        }
    }

    debug!(
        dir = %output_dir.display(),
        written,
        skipped,
        failed,
        cancelled,
        "Segment writing complete"
    );

    WriteOutcome {
        boundaries,
        written,
        skipped,
        failed,
        cancelled,
    }
}

/// Empty or all-zero audio.
fn is_silent(samples: &[f32]) -> bool {
    samples.iter().all(|s| *s == 0.0)
}

fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

/// Write mono 16-bit PCM.
fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> MediaResult<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for s in samples {
        let value = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(value)?;
    }
    writer.finalize()?;
    Ok(())
}
