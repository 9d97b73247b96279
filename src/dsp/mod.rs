//! Frequency-domain equalization
//!
//! `band` parses and validates caller-supplied adjustments; `spectral_eq`
//! applies them to sample buffers.

pub mod band;
pub mod spectral_eq;

pub use band::{parse_bands, BandDescriptor, DEFAULT_MAX_BANDS, MAX_GAIN_DB};
pub use spectral_eq::{band_gain, equalize, equalize_buffer, BANDWIDTH_RATIO};
