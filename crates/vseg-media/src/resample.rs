//! Sinc resampling for in-process decoded audio.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Input frames fed to the resampler per call.
const CHUNK_SIZE: usize = 1024;

/// Resample mono audio from `from_rate` to `to_rate`.
///
/// The output is aligned with the input (the filter delay is removed) and has
/// `ceil(len * to_rate / from_rate)` samples.
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> MediaResult<Vec<f32>> {
    if input.is_empty() || from_rate == to_rate {
        return Ok(input.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(MediaError::internal("Cannot resample with a zero sample rate"));
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = interpolation_params(ratio);
    debug!(
        from_rate,
        to_rate,
        ratio = format!("{:.3}", ratio),
        sinc_len = params.sinc_len,
        "Resampling audio"
    );

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, 1)
        .map_err(|e| MediaError::internal(format!("Failed to create resampler: {}", e)))?;

    let expected = (input.len() as u64 * to_rate as u64).div_ceil(from_rate as u64) as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay + CHUNK_SIZE);

    let mut pos = 0;
    while input.len() - pos >= resampler.input_frames_next() {
        let needed = resampler.input_frames_next();
        let chunk = [&input[pos..pos + needed]];
        let out = resampler
            .process(&chunk[..], None)
            .map_err(|e| MediaError::internal(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&out[0]);
        pos += needed;
    }

    if pos < input.len() {
        let tail = [&input[pos..]];
        let out = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(|e| MediaError::internal(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&out[0]);
    }

    // Flush the filter until the delayed tail is out
    while output.len() < expected + delay {
        let out = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| MediaError::internal(format!("Resampling failed: {}", e)))?;
        if out[0].is_empty() {
            break;
        }
        output.extend_from_slice(&out[0]);
    }

    let mut aligned: Vec<f32> = output.into_iter().skip(delay).take(expected).collect();
    aligned.resize(expected, 0.0);

    debug!(
        input_samples = input.len(),
        output_samples = aligned.len(),
        "Resampling complete"
    );

    Ok(aligned)
}

/// Sinc parameters by conversion ratio.
fn interpolation_params(ratio: f64) -> SincInterpolationParameters {
    let (sinc_len, interpolation, oversampling_factor) = if ratio >= 2.0 || ratio <= 0.5 {
        (512, SincInterpolationType::Cubic, 512)
    } else if ratio >= 1.5 {
        (384, SincInterpolationType::Cubic, 384)
    } else if ratio > 1.0 {
        (256, SincInterpolationType::Linear, 256)
    } else {
        (384, SincInterpolationType::Linear, 384)
    };

    SincInterpolationParameters {
        sinc_len,
        f_cutoff: 0.95,
        interpolation,
        oversampling_factor,
        window: WindowFunction::BlackmanHarris2,
    }
}
