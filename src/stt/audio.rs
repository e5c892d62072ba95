//! WAV decoding and preprocessing for recognition input.
//!
//! The recognition model wants 16 kHz mono f32 in [-1.0, 1.0]. Extracted
//! artifacts arrive at whatever rate and channel count the source used, so
//! everything funnels through here first.

use crate::defaults::SAMPLE_RATE;
use crate::error::{JimakuError, Result};
use std::path::Path;

/// Load a WAV artifact and preprocess it into model-ready samples.
///
/// Multi-channel audio is downmixed by averaging the channels — dropping
/// all but one would lose signal that only one channel carries. Anything
/// that isn't 16-bit integer PCM is rejected; the extraction collaborator
/// always produces that format.
pub fn load_samples(path: &Path) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path).map_err(|e| JimakuError::AudioDecode {
        message: format!("failed to open {}: {}", path.display(), e),
    })?;

    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(JimakuError::AudioDecode {
            message: format!(
                "unsupported WAV format in {}: expected 16-bit PCM, got {}-bit {:?}",
                path.display(),
                spec.bits_per_sample,
                spec.sample_format
            ),
        });
    }

    let raw_samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| JimakuError::AudioDecode {
            message: format!("failed to read samples from {}: {}", path.display(), e),
        })?;

    let mono = downmix(&raw_samples, spec.channels);
    let resampled = if spec.sample_rate != SAMPLE_RATE {
        resample(&mono, spec.sample_rate, SAMPLE_RATE)
    } else {
        mono
    };

    Ok(to_f32(&resampled))
}

/// Average interleaved channels into mono.
fn downmix(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let n = channels as usize;
    samples
        .chunks_exact(n)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / n as i32) as i16
        })
        .collect()
}

/// Simple linear interpolation resampling.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}

/// Convert 16-bit PCM to f32 normalized to [-1.0, 1.0].
fn to_f32(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&sample| sample as f32 / 32768.0)
        .collect()
}
