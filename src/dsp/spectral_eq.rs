//! Spectral Equalizer
//!
//! Applies Gaussian bell boosts/cuts to the whole signal at once in the
//! frequency domain: forward real FFT, per-bin gain, inverse real FFT.
//!
//! The transform pair runs in `f64` and has exactly the input length, so an
//! empty band list (or all-zero gains) reproduces the input to within `f32`
//! rounding, for odd and even lengths alike.

use rayon::prelude::*;
use realfft::num_complex::Complex64;
use realfft::RealFftPlanner;

use super::band::BandDescriptor;
use crate::engine::buffer::{db_to_linear, AudioBuffer};
use crate::error::{Result, SpectraError};

/// Bell width as a fraction of the center frequency (standard deviation of
/// the Gaussian, in Hz, is `frequency * BANDWIDTH_RATIO`)
pub const BANDWIDTH_RATIO: f64 = 0.3;

/// Equalize a single channel
///
/// # Arguments
/// * `samples` - Time-domain samples of one channel
/// * `sample_rate` - Sample rate in Hz, used to map bins to frequencies
/// * `bands` - Adjustments, applied multiplicatively in the given order
///
/// # Returns
/// A new sample sequence of the same length
///
/// # Errors
/// * `Validation` - zero sample rate, or an invalid band
/// * `Transform` - the FFT pair failed or produced non-finite samples
pub fn equalize(samples: &[f32], sample_rate: u32, bands: &[BandDescriptor]) -> Result<Vec<f32>> {
    validate_request(sample_rate, bands)?;

    let n = samples.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut planner = RealFftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut time_domain: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
    let mut spectrum = forward.make_output_vec();
    forward
        .process(&mut time_domain, &mut spectrum)
        .map_err(|e| SpectraError::Transform {
            reason: format!("forward FFT of {} samples failed: {}", n, e),
        })?;

    let bin_hz = sample_rate as f64 / n as f64;
    for band in bands.iter().filter(|b| !b.is_bypass()) {
        apply_band(&mut spectrum, bin_hz, band);
    }

    // The inverse real transform requires purely real DC and Nyquist bins
    spectrum[0].im = 0.0;
    if n % 2 == 0 {
        if let Some(nyquist) = spectrum.last_mut() {
            nyquist.im = 0.0;
        }
    }

    let mut output = inverse.make_output_vec();
    inverse
        .process(&mut spectrum, &mut output)
        .map_err(|e| SpectraError::Transform {
            reason: format!("inverse FFT of {} samples failed: {}", n, e),
        })?;

    // realfft leaves the inverse unnormalized
    let scale = 1.0 / n as f64;
    let result: Vec<f32> = output.iter().map(|&s| (s * scale) as f32).collect();

    if let Some(pos) = result.iter().position(|s| !s.is_finite()) {
        return Err(SpectraError::Transform {
            reason: format!("equalized signal is not finite at sample {}", pos),
        });
    }

    Ok(result)
}

/// Equalize every channel of a buffer
///
/// Channels are independent and processed in parallel; the sample rate and
/// channel count of the result match the input.
pub fn equalize_buffer(buffer: &AudioBuffer, bands: &[BandDescriptor]) -> Result<AudioBuffer> {
    validate_request(buffer.sample_rate, bands)?;

    let samples = buffer
        .samples
        .par_iter()
        .map(|channel| equalize(channel, buffer.sample_rate, bands))
        .collect::<Result<Vec<_>>>()?;

    Ok(AudioBuffer {
        samples,
        sample_rate: buffer.sample_rate,
    })
}

/// Linear gain a single band applies at `freq` Hz
///
/// `1 + mask * (linear - 1)` with a Gaussian mask centered on the band.
pub fn band_gain(band: &BandDescriptor, freq: f64) -> f64 {
    let linear = db_to_linear(band.gain);
    let bandwidth = band.frequency * BANDWIDTH_RATIO;
    // Normalize before squaring; squaring first overflows for huge center
    // frequencies and underflows for tiny ones.
    let z = (freq - band.frequency) / bandwidth;
    let mask = (-0.5 * z * z).exp();
    if !mask.is_finite() {
        return 1.0;
    }
    1.0 + mask * (linear - 1.0)
}

fn apply_band(spectrum: &mut [Complex64], bin_hz: f64, band: &BandDescriptor) {
    for (k, coeff) in spectrum.iter_mut().enumerate() {
        *coeff *= band_gain(band, k as f64 * bin_hz);
    }
}

fn validate_request(sample_rate: u32, bands: &[BandDescriptor]) -> Result<()> {
    if sample_rate == 0 {
        return Err(SpectraError::validation("sample rate must be positive"));
    }
    bands.iter().try_for_each(BandDescriptor::validate)
}
