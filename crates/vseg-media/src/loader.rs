//! Audio loading.
//!
//! WAV files are decoded in-process with `hound`. Everything else goes
//! through FFmpeg, which writes raw mono `f32le` samples to a temp file.
//! Either way the caller gets a mono `f32` buffer at a known rate.

use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_audio;
use crate::resample::resample;

/// Shortest FFmpeg decode timeout, in seconds.
const MIN_DECODE_TIMEOUT_SECS: u64 = 300;

/// Decode timeout for a file lasting `duration_secs` (0 when unknown).
///
/// Decoding runs far faster than real time, so the source duration bounds
/// any healthy decode.
fn decode_timeout_secs(duration_secs: f64) -> u64 {
    if duration_secs.is_finite() && duration_secs > 0.0 {
        (duration_secs.ceil() as u64).max(MIN_DECODE_TIMEOUT_SECS)
    } else {
        MIN_DECODE_TIMEOUT_SECS
    }
}

/// Decoded mono signal.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Samples in `[start, end)`, clipped to the buffer.
    pub fn slice(&self, start: usize, end: usize) -> &[f32] {
        let end = end.min(self.samples.len());
        let start = start.min(end);
        &self.samples[start..end]
    }

    /// Convert seconds to a sample count at this buffer's rate.
    pub fn secs_to_samples(&self, secs: f64) -> usize {
        (secs.max(0.0) * self.sample_rate as f64).round() as usize
    }
}

/// Load a recording as mono `f32`.
///
/// With `target_rate` set the buffer is resampled to that rate; otherwise the
/// native rate is kept.
pub async fn load_audio(path: impl AsRef<Path>, target_rate: Option<u32>) -> MediaResult<AudioBuffer> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::unreadable(path, "file not found"));
    }

    let buffer = if is_wav(path) {
        let owned = path.to_path_buf();
        let decoded = tokio::task::spawn_blocking(move || decode_wav(&owned, target_rate))
            .await
            .map_err(|e| MediaError::internal(format!("WAV decode task failed: {}", e)))?;

        match decoded {
            Ok(buffer) => buffer,
            // hound rejects some valid WAV variants; FFmpeg can still read them
            Err(MediaError::Wav(hound::Error::Unsupported)) => {
                warn!(path = %path.display(), "WAV variant not supported in-process, using FFmpeg");
                load_with_ffmpeg(path, target_rate).await?
            }
            Err(MediaError::Wav(e)) => return Err(MediaError::unreadable(path, e.to_string())),
            Err(e) => return Err(e),
        }
    } else {
        load_with_ffmpeg(path, target_rate).await?
    };

    if buffer.is_empty() {
        return Err(MediaError::EmptySignal);
    }

    debug!(
        path = %path.display(),
        samples = buffer.len(),
        sample_rate = buffer.sample_rate(),
        duration_secs = format!("{:.2}", buffer.duration_secs()),
        "Loaded audio"
    );

    Ok(buffer)
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav") || e.eq_ignore_ascii_case("wave"))
        .unwrap_or(false)
}

/// Decode a WAV file, downmix to mono and optionally resample.
fn decode_wav(path: &Path, target_rate: Option<u32>) -> MediaResult<AudioBuffer> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mono = downmix(&interleaved, channels);
    debug!(
        channels,
        native_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        "Decoded WAV"
    );

    match target_rate {
        Some(rate) if rate != spec.sample_rate => {
            Ok(AudioBuffer::new(resample(&mono, spec.sample_rate, rate)?, rate))
        }
        _ => Ok(AudioBuffer::new(mono, spec.sample_rate)),
    }
}

/// Average interleaved channels into one.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Decode any container FFmpeg understands.
async fn load_with_ffmpeg(path: &Path, target_rate: Option<u32>) -> MediaResult<AudioBuffer> {
    let info = match probe_audio(path).await {
        Ok(info) => info,
        Err(MediaError::FfprobeNotFound) => {
            return Err(MediaError::unsupported(
                "Non-WAV input requires ffprobe, which is not installed",
            ))
        }
        Err(MediaError::FfprobeFailed { stderr, .. }) => {
            return Err(MediaError::unreadable(
                path,
                stderr.unwrap_or_else(|| "ffprobe could not read the file".to_string()),
            ))
        }
        Err(e) => return Err(e),
    };

    if check_ffmpeg().is_err() {
        return Err(MediaError::unsupported(
            "Non-WAV input requires ffmpeg, which is not installed",
        ));
    }

    let rate = target_rate.unwrap_or(info.sample_rate);
    debug!(
        input = %path.display(),
        codec = %info.codec,
        native_rate = info.sample_rate,
        channels = info.channels,
        rate,
        "Extracting audio with FFmpeg"
    );

    let temp = NamedTempFile::new()?;
    let cmd = FfmpegCommand::new(path, temp.path())
        .no_video()
        .channels(1)
        .sample_rate(rate)
        .format("f32le");

    let runner = FfmpegRunner::new().with_timeout(decode_timeout_secs(info.duration));
    match runner.run(&cmd).await {
        Ok(()) => {}
        Err(MediaError::FfmpegFailed {
            stderr, exit_code, ..
        }) => {
            let reason = match stderr.filter(|s| !s.is_empty()) {
                Some(stderr) => stderr,
                None => format!("ffmpeg exited with code {:?}", exit_code),
            };
            return Err(MediaError::unreadable(path, reason));
        }
        Err(e) => return Err(e),
    }

    let bytes = tokio::fs::read(temp.path()).await?;
    Ok(AudioBuffer::new(f32le_to_samples(&bytes), rate))
}

/// Convert raw little-endian `f32` bytes to samples.
fn f32le_to_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav_i16(path: &Path, rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_buffer_helpers() {
        let buffer = AudioBuffer::new(vec![0.0; 32_000], 16_000);
        assert!((buffer.duration_secs() - 2.0).abs() < 1e-9);
        assert_eq!(buffer.slice(31_990, 40_000).len(), 10);
        assert_eq!(buffer.secs_to_samples(0.5), 8_000);
    }

    #[test]
    fn test_decode_timeout_scales_with_duration() {
        assert_eq!(decode_timeout_secs(0.0), MIN_DECODE_TIMEOUT_SECS);
        assert_eq!(decode_timeout_secs(f64::NAN), MIN_DECODE_TIMEOUT_SECS);
        assert_eq!(decode_timeout_secs(42.0), MIN_DECODE_TIMEOUT_SECS);
        assert_eq!(decode_timeout_secs(3_600.2), 3_601);
    }

    #[test]
    fn test_downmix_averages() {
        let stereo = vec![0.5, -0.5, 1.0, 0.0];
        assert_eq!(downmix(&stereo, 2), vec![0.0, 0.5]);
        assert_eq!(downmix(&stereo, 1), stereo);
    }

    #[test]
    fn test_f32le_conversion() {
        let bytes: Vec<u8> = [0.0f32, 0.5, -1.0]
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect();
        assert_eq!(f32le_to_samples(&bytes), vec![0.0, 0.5, -1.0]);
    }

    #[tokio::test]
    async fn test_load_wav_stereo_int16() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav_i16(&path, 8_000, 2, &[16_384, 16_384, -16_384, 0]);

        let buffer = load_audio(&path, None).await.unwrap();
        assert_eq!(buffer.sample_rate(), 8_000);
        assert_eq!(buffer.len(), 2);
        assert!((buffer.samples()[0] - 0.5).abs() < 1e-4);
        assert!((buffer.samples()[1] + 0.25).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_load_wav_resamples_to_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav_i16(&path, 8_000, 1, &vec![1_000; 8_000]);

        let buffer = load_audio(&path, Some(16_000)).await.unwrap();
        assert_eq!(buffer.sample_rate(), 16_000);
        assert_eq!(buffer.len(), 16_000);
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let err = load_audio("/nonexistent/input.wav", None).await.unwrap_err();
        assert!(matches!(err, MediaError::UnreadableFile { .. }));
    }

    #[tokio::test]
    async fn test_empty_wav_is_empty_signal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav_i16(&path, 16_000, 1, &[]);

        let err = load_audio(&path, None).await.unwrap_err();
        assert!(matches!(err, MediaError::EmptySignal));
    }

    #[tokio::test]
    async fn test_garbage_wav_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.wav");
        tokio::fs::write(&path, b"definitely not riff data").await.unwrap();

        let err = load_audio(&path, None).await.unwrap_err();
        assert!(matches!(err, MediaError::UnreadableFile { .. }));
    }
}
