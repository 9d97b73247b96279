//! Audio Buffer Management
//!
//! Provides the planar audio buffer shared by the codec and the equalizer,
//! plus the level helpers used by tests and logging.

use crate::error::{Result, SpectraError};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
///
/// # Arguments
/// * `db` - Value in decibels
///
/// # Returns
/// Linear amplitude ratio (`10^(db/20)`)
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns `f64::NEG_INFINITY` for zero or negative input.
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Root mean square of a single sample sequence. Zero for empty input.
pub fn rms_linear(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt()
}

/// Calculate the RMS level of an audio buffer in dB
///
/// # Arguments
/// * `buffer` - Reference to the AudioBuffer to analyze
///
/// # Returns
/// RMS level in dB across all channels. Returns `f64::NEG_INFINITY` for empty
/// or silent buffers.
pub fn calculate_rms(buffer: &AudioBuffer) -> f64 {
    let total_samples = buffer.num_channels() * buffer.num_samples();
    if total_samples == 0 {
        return f64::NEG_INFINITY;
    }

    let sum_squares: f64 = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| (s as f64) * (s as f64))
        .sum();

    linear_to_db((sum_squares / total_samples as f64).sqrt())
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Audio samples as decoded from an upload
///
/// Stores audio as non-interleaved 32-bit floating point samples, one
/// `Vec<f32>` per channel, all of equal length. The sample rate is carried
/// alongside and is never altered by processing.
///
/// # Example
/// ```
/// use spectra::engine::AudioBuffer;
///
/// let buffer = AudioBuffer::silence(2, 44100, 44100);
/// assert_eq!(buffer.num_channels(), 2);
/// assert_eq!(buffer.num_samples(), 44100);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a buffer from planar channel data
    ///
    /// # Errors
    /// * `Validation` - if there are no channels, the channels differ in
    ///   length, or the sample rate is zero
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(SpectraError::validation("audio must have at least one channel"));
        }
        if sample_rate == 0 {
            return Err(SpectraError::validation("sample rate must be positive"));
        }

        let len = samples[0].len();
        if let Some((ch, channel)) = samples.iter().enumerate().find(|(_, c)| c.len() != len) {
            return Err(SpectraError::validation(format!(
                "channel {} has {} samples, expected {}",
                ch,
                channel.len(),
                len
            )));
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create a zeroed buffer
    pub fn silence(num_channels: usize, num_samples: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; num_channels],
            sample_rate,
        }
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Arguments
    /// * `interleaved` - Interleaved sample data (L, R, L, R, ... for stereo)
    /// * `num_channels` - Number of interleaved channels
    /// * `sample_rate` - Sample rate in Hz
    pub fn from_interleaved(
        interleaved: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 {
            return Err(SpectraError::validation("audio must have at least one channel"));
        }

        if interleaved.len() % num_channels != 0 {
            return Err(SpectraError::Decode {
                reason: format!(
                    "interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
                source: None,
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Self::from_channels(samples, sample_rate)
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.num_channels();
        let num_samples = self.num_samples();

        let mut interleaved = Vec::with_capacity(num_channels * num_samples);
        for sample_idx in 0..num_samples {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }

        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer is empty (no samples)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }

    /// Get the duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_samples() as f64 / self.sample_rate as f64
    }

    /// Get a reference to a channel's samples
    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.samples[ch]
    }

    /// Check that every sample is finite
    pub fn is_finite(&self) -> bool {
        self.samples.iter().flatten().all(|s| s.is_finite())
    }
}

/// Generate a mono sine tone, used by tests and fixtures
pub fn generate_test_tone(frequency: f64, duration_secs: f64, sample_rate: u32) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f64) as usize;
    let angular_freq = 2.0 * std::f64::consts::PI * frequency / sample_rate as f64;

    let samples = (0..num_samples)
        .map(|i| (angular_freq * i as f64).sin() as f32)
        .collect();

    AudioBuffer {
        samples: vec![samples],
        sample_rate,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_db_conversions() {
        assert_relative_eq!(db_to_linear(0.0), 1.0);
        assert_relative_eq!(db_to_linear(20.0), 10.0, epsilon = 1e-12);
        assert_relative_eq!(db_to_linear(-6.0), 0.501187, epsilon = 1e-6);
        assert_relative_eq!(linear_to_db(10.0), 20.0, epsilon = 1e-12);
        assert_eq!(linear_to_db(0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_rms_of_sine() {
        let tone = generate_test_tone(1000.0, 1.0, 48000);
        // RMS of a full-scale sine is 1/sqrt(2)
        assert_relative_eq!(
            rms_linear(tone.channel(0)),
            std::f64::consts::FRAC_1_SQRT_2,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_rms_of_silence() {
        let buffer = AudioBuffer::silence(1, 1000, 44100);
        assert_eq!(rms_linear(buffer.channel(0)), 0.0);
        assert_eq!(calculate_rms(&buffer), f64::NEG_INFINITY);
        assert_eq!(rms_linear(&[]), 0.0);
    }

    #[test]
    fn test_interleave_roundtrip() {
        let interleaved = vec![1.0, 5.0, 2.0, 6.0, 3.0, 7.0];
        let buffer = AudioBuffer::from_interleaved(&interleaved, 2, 44100).unwrap();

        assert_eq!(buffer.channel(0), &[1.0, 2.0, 3.0]);
        assert_eq!(buffer.channel(1), &[5.0, 6.0, 7.0]);
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_from_interleaved_rejects_ragged_frames() {
        let result = AudioBuffer::from_interleaved(&[1.0, 2.0, 3.0], 2, 44100);
        assert!(matches!(result, Err(SpectraError::Decode { .. })));
    }

    #[test]
    fn test_from_channels_validation() {
        assert!(AudioBuffer::from_channels(vec![], 44100).is_err());
        assert!(AudioBuffer::from_channels(vec![vec![0.0]], 0).is_err());
        assert!(AudioBuffer::from_channels(vec![vec![0.0, 1.0], vec![0.0]], 44100).is_err());

        let ok = AudioBuffer::from_channels(vec![vec![], vec![]], 8000).unwrap();
        assert!(ok.is_empty());
        assert_eq!(ok.num_channels(), 2);
    }

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::silence(1, 22050, 44100);
        assert_relative_eq!(buffer.duration_secs(), 0.5);
    }

    #[test]
    fn test_is_finite() {
        let mut buffer = AudioBuffer::silence(1, 4, 44100);
        assert!(buffer.is_finite());
        buffer.samples[0][2] = f32::NAN;
        assert!(!buffer.is_finite());
    }
}
