//! Audio codec for Spectra
//!
//! Decodes uploaded WAV bytes into an `AudioBuffer` and encodes processed
//! buffers back into WAV bytes. Everything happens in memory; the session
//! store decides where bytes end up on disk.
//!
//! Sample rate and channel count pass through untouched in both directions.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::buffer::AudioBuffer;
use crate::error::{Result, SpectraError};

/// Converts between container bytes and sample buffers
pub trait AudioCodec: Send + Sync {
    /// Decode container bytes into samples, sample rate and channel count
    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer>;

    /// Encode a buffer into container bytes
    fn encode(&self, buffer: &AudioBuffer) -> Result<Vec<u8>>;
}

/// WAV codec backed by hound
///
/// Reads 8/16/24/32-bit integer and 32-bit float WAV; always writes 32-bit
/// float, which holds the internal `f32` samples losslessly.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavCodec;

impl AudioCodec for WavCodec {
    /// Decode WAV bytes
    ///
    /// # Errors
    /// * `Decode` - if the bytes are not a readable WAV stream or use an
    ///   unsupported sample encoding
    fn decode(&self, bytes: &[u8]) -> Result<AudioBuffer> {
        let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| SpectraError::Decode {
            reason: format!("Failed to open WAV data: {}", e),
            source: Some(Box::new(e)),
        })?;

        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(SpectraError::Decode {
                reason: "WAV header declares zero channels".to_string(),
                source: None,
            });
        }
        if spec.sample_rate == 0 {
            return Err(SpectraError::Decode {
                reason: "WAV header declares a zero sample rate".to_string(),
                source: None,
            });
        }

        let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
        let buffer =
            AudioBuffer::from_interleaved(&interleaved, spec.channels as usize, spec.sample_rate)?;

        // Float WAV can carry NaN or infinity; that is corrupt input, not a
        // processing failure.
        if !buffer.is_finite() {
            return Err(SpectraError::Decode {
                reason: "WAV data contains non-finite samples".to_string(),
                source: None,
            });
        }
        Ok(buffer)
    }

    fn encode(&self, buffer: &AudioBuffer) -> Result<Vec<u8>> {
        let channels = u16::try_from(buffer.num_channels()).map_err(|_| {
            SpectraError::validation(format!("{} channels cannot be encoded", buffer.num_channels()))
        })?;

        let spec = WavSpec {
            channels,
            sample_rate: buffer.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).map_err(encode_error)?;
            for sample in buffer.to_interleaved() {
                writer.write_sample(sample).map_err(encode_error)?;
            }
            writer.finalize().map_err(encode_error)?;
        }

        Ok(cursor.into_inner())
    }
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn encode_error(e: hound::Error) -> SpectraError {
    match e {
        hound::Error::IoError(io) => SpectraError::Io(io),
        other => SpectraError::Transform {
            reason: format!("Failed to encode WAV: {}", other),
        },
    }
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let decode_error = |bits: &str, e: hound::Error| SpectraError::Decode {
        reason: format!("Failed to read {} samples: {}", bits, e),
        source: Some(Box::new(e)),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| decode_error("float", e)),
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| decode_error("8-bit", e)),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| decode_error("16-bit", e)),
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8388608.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| decode_error("24-bit", e)),
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| decode_error("32-bit int", e)),
            _ => Err(SpectraError::Decode {
                reason: format!("{}-bit integer audio is not supported", bits_per_sample),
                source: None,
            }),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
