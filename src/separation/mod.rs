//! Stem separation
//!
//! Vocal/instrumental separation is delegated to an external tool behind the
//! [`StemSeparator`] trait. This module only moves files between that tool
//! and the session store.

mod command;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::error::{Result, SpectraError};
use crate::pipeline::Limits;
use crate::session::{ArtifactKind, SessionId, SessionStore};

pub use command::CommandSeparator;

/// Files produced by one separation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemPaths {
    pub vocals: PathBuf,
    pub instrumental: PathBuf,
}

/// Trait that all stem separators must implement
pub trait StemSeparator: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &str;

    /// Separate `input` into vocal and instrumental stems written somewhere
    /// under `output_dir`
    ///
    /// # Errors
    /// * `SeparationUnavailable` - the tool cannot be started
    /// * `SeparationFailed` - the tool ran but did not produce both stems
    fn separate(&self, input: &Path, output_dir: &Path) -> Result<StemPaths>;
}

/// Separation orchestrator: upload → session → separator → session
pub struct SeparationService {
    store: Arc<dyn SessionStore>,
    separator: Option<Arc<dyn StemSeparator>>,
    limits: Limits,
}

impl SeparationService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        separator: Option<Arc<dyn StemSeparator>>,
        limits: Limits,
    ) -> Self {
        Self {
            store,
            separator,
            limits,
        }
    }

    /// Check if a separator is configured
    pub fn is_available(&self) -> bool {
        self.separator.is_some()
    }

    /// Run separation on an uploaded file
    ///
    /// On success the session holds `input`, `vocals` and `instrumental`.
    pub fn separate(&self, raw_audio: &[u8]) -> Result<SessionId> {
        let separator = self
            .separator
            .as_ref()
            .ok_or_else(|| SpectraError::SeparationUnavailable {
                reason: "no separator is configured".to_string(),
            })?;
        self.limits.check_upload(raw_audio)?;

        let start = Instant::now();
        let session = self.store.create_session()?;
        self.store
            .write_artifact(&session, ArtifactKind::Input, raw_audio)?;

        let input = self.store.resolve_path(&session, ArtifactKind::Input)?;
        let output_dir = self.store.scratch_dir(&session)?;
        let stems = separator.separate(&input, &output_dir)?;

        self.store
            .import_artifact(&session, ArtifactKind::Vocals, &stems.vocals)?;
        self.store
            .import_artifact(&session, ArtifactKind::Instrumental, &stems.instrumental)?;

        info!(
            session = %session,
            separator = separator.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "separated stems"
        );
        Ok(session)
    }
}
