//! Processing Orchestrator
//!
//! Runs one equalization request end to end:
//! validate bands → create session → store input → decode → equalize →
//! encode → store output. Bands are validated before anything touches
//! storage, so a malformed request leaves no trace.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::config::ServiceConfig;
use crate::dsp::{equalize_buffer, parse_bands, BandDescriptor, DEFAULT_MAX_BANDS};
use crate::engine::AudioCodec;
use crate::error::{Result, SpectraError};
use crate::session::{ArtifactKind, SessionId, SessionStore};

/// Request size limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Largest accepted upload, in bytes
    pub max_upload_bytes: usize,
    /// Largest accepted band list
    pub max_bands: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 100 * 1024 * 1024,
            max_bands: DEFAULT_MAX_BANDS,
        }
    }
}

impl From<&ServiceConfig> for Limits {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            max_bands: config.max_bands,
        }
    }
}

impl Limits {
    /// Reject empty or oversized uploads
    pub fn check_upload(&self, raw_audio: &[u8]) -> Result<()> {
        if raw_audio.is_empty() {
            return Err(SpectraError::validation("uploaded audio is empty"));
        }
        if raw_audio.len() > self.max_upload_bytes {
            return Err(SpectraError::validation(format!(
                "upload of {} bytes exceeds the {} byte limit",
                raw_audio.len(),
                self.max_upload_bytes
            )));
        }
        Ok(())
    }
}

/// Equalization orchestrator and artifact retrieval
pub struct Processor {
    store: Arc<dyn SessionStore>,
    codec: Arc<dyn AudioCodec>,
    limits: Limits,
}

impl Processor {
    pub fn new(store: Arc<dyn SessionStore>, codec: Arc<dyn AudioCodec>, limits: Limits) -> Self {
        Self {
            store,
            codec,
            limits,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Equalize an uploaded file according to a serialized band list
    ///
    /// # Arguments
    /// * `raw_audio` - The uploaded container bytes
    /// * `bands_json` - JSON list of `{frequency, gain}` objects
    ///
    /// # Returns
    /// The session holding the `input` and `processed` artifacts
    ///
    /// # Errors
    /// * `Validation` - bad band list or upload size; no session is created
    /// * `Decode` - the upload is not readable audio or carries non-finite samples
    /// * `Transform` - the equalizer failed
    pub fn process(&self, raw_audio: &[u8], bands_json: &str) -> Result<SessionId> {
        self.limits.check_upload(raw_audio)?;
        let bands = parse_bands(bands_json, self.limits.max_bands)?;
        self.process_bands(raw_audio, &bands)
    }

    /// Same as [`Processor::process`] with an already parsed band list
    pub fn process_bands(&self, raw_audio: &[u8], bands: &[BandDescriptor]) -> Result<SessionId> {
        self.limits.check_upload(raw_audio)?;
        if bands.len() > self.limits.max_bands {
            return Err(SpectraError::validation(format!(
                "{} bands requested, at most {} allowed",
                bands.len(),
                self.limits.max_bands
            )));
        }
        bands.iter().try_for_each(BandDescriptor::validate)?;

        let start = Instant::now();
        let session = self.store.create_session()?;
        self.store
            .write_artifact(&session, ArtifactKind::Input, raw_audio)?;

        let input = self.codec.decode(raw_audio)?;
        let output = equalize_buffer(&input, bands)?;
        let encoded = self.codec.encode(&output)?;

        self.store
            .write_artifact(&session, ArtifactKind::Processed, &encoded)?;

        info!(
            session = %session,
            bands = bands.len(),
            channels = output.num_channels(),
            samples = output.num_samples(),
            sample_rate = output.sample_rate,
            duration_secs = output.duration_secs(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "equalized upload"
        );
        Ok(session)
    }

    /// Locate a finished artifact for streaming
    ///
    /// Pure read; safe to poll before the artifact exists, in which case it
    /// reports `NotFound`.
    pub fn retrieve(&self, session: &SessionId, kind: ArtifactKind) -> Result<PathBuf> {
        if !kind.is_retrievable() {
            return Err(SpectraError::validation(format!(
                "Invalid track type: {}",
                kind
            )));
        }
        self.store.resolve_path(session, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{generate_test_tone, rms_linear, AudioBuffer, WavCodec};
    use crate::session::FsSessionStore;
    use approx::assert_relative_eq;
    use std::fs;
    use tempfile::TempDir;

    fn processor() -> (TempDir, Processor) {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(FsSessionStore::new(temp.path()).unwrap());
        let processor = Processor::new(store, Arc::new(WavCodec::default()), Limits::default());
        (temp, processor)
    }

    fn wav(buffer: &AudioBuffer) -> Vec<u8> {
        WavCodec::default().encode(buffer).unwrap()
    }

    #[test]
    fn test_process_writes_input_and_output() {
        let (_temp, processor) = processor();
        let upload = wav(&generate_test_tone(1000.0, 0.5, 44100));

        let session = processor
            .process(&upload, r#"[{"frequency": 1000, "gain": -6}]"#)
            .unwrap();

        let store = processor.store();
        assert_eq!(store.read_artifact(&session, ArtifactKind::Input).unwrap(), upload);

        let processed = store.read_artifact(&session, ArtifactKind::Processed).unwrap();
        let output = WavCodec::default().decode(&processed).unwrap();
        assert_eq!(output.sample_rate, 44100);
        assert_eq!(output.num_samples(), 22050);

        let ratio = rms_linear(output.channel(0)) / std::f64::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(ratio, 10f64.powf(-6.0 / 20.0), epsilon = 1e-2);
    }

    #[test]
    fn test_malformed_bands_create_nothing() {
        let (temp, processor) = processor();
        let upload = wav(&generate_test_tone(440.0, 0.1, 8000));

        let result = processor.process(&upload, "{not valid");
        assert!(matches!(result, Err(SpectraError::Validation { .. })));
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_undecodable_upload_keeps_input() {
        let (temp, processor) = processor();
        let result = processor.process(b"garbage bytes", "[]");
        assert!(matches!(result, Err(SpectraError::Decode { .. })));

        // The session and its input survive for inspection
        let sessions: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(sessions.len(), 1);
        let dir = sessions[0].as_ref().unwrap().path();
        assert_eq!(fs::read(dir.join("input.wav")).unwrap(), b"garbage bytes");
        assert!(!dir.join("processed.wav").exists());
    }

    #[test]
    fn test_non_finite_samples_are_decode_error() {
        let (_temp, processor) = processor();
        let mut tone = generate_test_tone(440.0, 0.1, 8000);
        tone.samples[0][3] = f32::NAN;

        let result = processor.process(&wav(&tone), "[]");
        assert!(matches!(result, Err(SpectraError::Decode { .. })));
    }

    #[test]
    fn test_empty_upload_rejected() {
        let (_temp, processor) = processor();
        assert!(matches!(
            processor.process(b"", "[]"),
            Err(SpectraError::Validation { .. })
        ));
    }

    #[test]
    fn test_band_limit() {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(FsSessionStore::new(temp.path()).unwrap());
        let limits = Limits {
            max_bands: 1,
            ..Limits::default()
        };
        let processor = Processor::new(store, Arc::new(WavCodec::default()), limits);
        let upload = wav(&generate_test_tone(440.0, 0.1, 8000));

        let two = r#"[{"frequency": 100, "gain": 1}, {"frequency": 200, "gain": 1}]"#;
        assert!(matches!(
            processor.process(&upload, two),
            Err(SpectraError::Validation { .. })
        ));
    }

    #[test]
    fn test_retrieve_before_processing_is_not_found() {
        let (_temp, processor) = processor();
        let session = processor.store().create_session().unwrap();

        assert!(matches!(
            processor.retrieve(&session, ArtifactKind::Processed),
            Err(SpectraError::NotFound { .. })
        ));
    }

    #[test]
    fn test_retrieve_refuses_input() {
        let (_temp, processor) = processor();
        let upload = wav(&generate_test_tone(440.0, 0.1, 8000));
        let session = processor.process(&upload, "[]").unwrap();

        assert!(processor.retrieve(&session, ArtifactKind::Processed).is_ok());
        assert!(matches!(
            processor.retrieve(&session, ArtifactKind::Input),
            Err(SpectraError::Validation { .. })
        ));
    }
}
