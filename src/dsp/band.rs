//! Band descriptors for the spectral equalizer
//!
//! Bands arrive as a JSON list of `{ "frequency": <Hz>, "gain": <dB> }`
//! objects and are validated once, here, before any storage or transform work.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectraError};

/// Largest boost or cut accepted for a single band, in dB
pub const MAX_GAIN_DB: f64 = 60.0;

/// Default cap on the number of bands in one request
pub const DEFAULT_MAX_BANDS: usize = 64;

/// One equalizer adjustment: a bell centered on `frequency` with `gain` dB
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandDescriptor {
    /// Center frequency in Hz
    pub frequency: f64,
    /// Gain in dB (0 is a no-op)
    pub gain: f64,
}

impl BandDescriptor {
    /// Create a validated band
    pub fn new(frequency: f64, gain: f64) -> Result<Self> {
        let band = Self { frequency, gain };
        band.validate()?;
        Ok(band)
    }

    /// Validate band parameters
    ///
    /// Frequencies at or above Nyquist are accepted; they only depend on the
    /// sample rate, which is not known here.
    pub fn validate(&self) -> Result<()> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(SpectraError::validation(format!(
                "band frequency must be a finite positive number, got {}",
                self.frequency
            )));
        }

        if !self.gain.is_finite() {
            return Err(SpectraError::validation(format!(
                "band gain must be finite, got {}",
                self.gain
            )));
        }

        if self.gain.abs() > MAX_GAIN_DB {
            return Err(SpectraError::validation(format!(
                "band gain {} dB is outside -{MAX_GAIN_DB}..={MAX_GAIN_DB} dB",
                self.gain
            )));
        }

        Ok(())
    }

    /// Check if this band leaves the signal unchanged
    pub fn is_bypass(&self) -> bool {
        self.gain == 0.0
    }
}

/// Parse and validate a serialized band list
///
/// # Arguments
/// * `json` - The raw `eq_settings` form value
/// * `max_bands` - Upper bound on the list length
///
/// # Errors
/// * `Validation` - malformed JSON, a non-list top level value, non-numeric
///   fields, too many bands, or any band failing [`BandDescriptor::validate`]
pub fn parse_bands(json: &str, max_bands: usize) -> Result<Vec<BandDescriptor>> {
    let bands: Vec<BandDescriptor> = serde_json::from_str(json)
        .map_err(|e| SpectraError::validation(format!("malformed band list: {}", e)))?;

    if bands.len() > max_bands {
        return Err(SpectraError::validation(format!(
            "{} bands requested, at most {} allowed",
            bands.len(),
            max_bands
        )));
    }

    for (index, band) in bands.iter().enumerate() {
        band.validate().map_err(|e| match e {
            SpectraError::Validation { reason } => {
                SpectraError::validation(format!("band {}: {}", index, reason))
            }
            other => other,
        })?;
    }

    Ok(bands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_parse_preserves_order() {
        let json = r#"[{"frequency": 1000, "gain": 6}, {"frequency": 60.5, "gain": -3.0}]"#;
        let bands = parse_bands(json, DEFAULT_MAX_BANDS).unwrap();

        assert_eq!(
            bands,
            vec![
                BandDescriptor {
                    frequency: 1000.0,
                    gain: 6.0
                },
                BandDescriptor {
                    frequency: 60.5,
                    gain: -3.0
                },
            ]
        );
    }

    #[test]
    fn test_parse_ignores_client_only_fields() {
        let json = r#"[{"frequency": 60, "gain": 0, "type": "lowshelf", "filter": null, "label": "60Hz"}]"#;
        let bands = parse_bands(json, DEFAULT_MAX_BANDS).unwrap();
        assert_eq!(bands.len(), 1);
        assert!(bands[0].is_bypass());
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_bands("[]", DEFAULT_MAX_BANDS).unwrap().is_empty());
    }

    #[test_case("{not valid" ; "malformed json")]
    #[test_case(r#"{"frequency": 1000, "gain": 6}"# ; "object instead of list")]
    #[test_case("42" ; "number instead of list")]
    #[test_case(r#"[{"frequency": "1000", "gain": 6}]"# ; "string frequency")]
    #[test_case(r#"[{"frequency": 1000}]"# ; "missing gain")]
    #[test_case(r#"[{"frequency": 0, "gain": 6}]"# ; "zero frequency")]
    #[test_case(r#"[{"frequency": -100, "gain": 6}]"# ; "negative frequency")]
    #[test_case(r#"[{"frequency": 1000, "gain": 120}]"# ; "gain out of range")]
    fn test_parse_rejects(json: &str) {
        let result = parse_bands(json, DEFAULT_MAX_BANDS);
        assert!(
            matches!(result, Err(SpectraError::Validation { .. })),
            "expected validation error for {}, got {:?}",
            json,
            result
        );
    }

    #[test]
    fn test_parse_enforces_band_limit() {
        let json = r#"[{"frequency": 100, "gain": 1}, {"frequency": 200, "gain": 1}, {"frequency": 300, "gain": 1}]"#;
        assert!(parse_bands(json, 3).is_ok());
        assert!(matches!(
            parse_bands(json, 2),
            Err(SpectraError::Validation { .. })
        ));
    }

    #[test]
    fn test_error_names_offending_band() {
        let json = r#"[{"frequency": 100, "gain": 1}, {"frequency": -5, "gain": 1}]"#;
        let err = parse_bands(json, DEFAULT_MAX_BANDS).unwrap_err();
        assert!(err.to_string().contains("band 1"), "{}", err);
    }

    #[test_case(0.0, 0.0 ; "zero frequency")]
    #[test_case(-1.0, 0.0 ; "negative frequency")]
    #[test_case(f64::NAN, 0.0 ; "nan frequency")]
    #[test_case(f64::INFINITY, 0.0 ; "infinite frequency")]
    #[test_case(1000.0, f64::NAN ; "nan gain")]
    #[test_case(1000.0, f64::NEG_INFINITY ; "infinite gain")]
    fn test_new_rejects(frequency: f64, gain: f64) {
        assert!(matches!(
            BandDescriptor::new(frequency, gain),
            Err(SpectraError::Validation { .. })
        ));
    }

    #[test]
    fn test_above_nyquist_is_valid() {
        assert!(BandDescriptor::new(96_000.0, 12.0).is_ok());
    }
}
