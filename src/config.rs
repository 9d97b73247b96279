//! Service configuration
//!
//! Defaults listen on port 8000 and keep sessions under `temp/`. Every value
//! can be overridden through `SPECTRA_*` environment variables, and the
//! binary's flags override those in turn.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dsp::DEFAULT_MAX_BANDS;
use crate::error::{Result, SpectraError};

/// Runtime configuration for the HTTP service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Directory holding one subdirectory per session
    pub storage_root: PathBuf,
    /// Largest accepted upload, in bytes
    pub max_upload_bytes: usize,
    /// Largest accepted band list
    pub max_bands: usize,
    /// How long a session is kept before the sweeper deletes it
    pub session_ttl_secs: u64,
    /// How often the sweeper runs
    pub sweep_interval_secs: u64,
    /// Upper bound on decode + transform + encode for one request
    pub processing_timeout_secs: u64,
    /// Stem-separation executable (spleeter-compatible CLI); `None` disables
    /// the separation endpoint
    pub separator_program: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            storage_root: PathBuf::from("temp"),
            max_upload_bytes: 100 * 1024 * 1024,
            max_bands: DEFAULT_MAX_BANDS,
            session_ttl_secs: 24 * 60 * 60,
            sweep_interval_secs: 10 * 60,
            processing_timeout_secs: 120,
            separator_program: None,
        }
    }
}

impl ServiceConfig {
    /// Build a configuration from `SPECTRA_*` environment variables
    ///
    /// Unset variables keep their defaults; set but unparsable numeric
    /// variables are an error rather than being silently ignored.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            listen_addr: env::var("SPECTRA_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            storage_root: env::var("SPECTRA_STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            max_upload_bytes: env_number("SPECTRA_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            max_bands: env_number("SPECTRA_MAX_BANDS", defaults.max_bands)?,
            session_ttl_secs: env_number("SPECTRA_SESSION_TTL_SECS", defaults.session_ttl_secs)?,
            sweep_interval_secs: env_number(
                "SPECTRA_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval_secs,
            )?,
            processing_timeout_secs: env_number(
                "SPECTRA_PROCESSING_TIMEOUT_SECS",
                defaults.processing_timeout_secs,
            )?,
            separator_program: env::var("SPECTRA_SEPARATOR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .or(defaults.separator_program),
        })
    }

    /// Check values that would make the service unusable
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.max_upload_bytes == 0 {
            return Err(SpectraError::validation("max_upload_bytes must be positive"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(SpectraError::validation("sweep_interval_secs must be positive"));
        }
        if self.processing_timeout_secs == 0 {
            return Err(SpectraError::validation(
                "processing_timeout_secs must be positive",
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr.parse().map_err(|e| {
            SpectraError::validation(format!("invalid listen_addr '{}': {}", self.listen_addr, e))
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_secs)
    }
}

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SpectraError::validation(format!("{} must be a number, got '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}
