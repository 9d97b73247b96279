//! CLI Module
//!
//! Command-line interface for the spectra service binary.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ServiceConfig;

/// Spectra - session-scoped spectral EQ and stem separation service
#[derive(Parser, Debug)]
#[command(name = "spectra-server")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags that take precedence over `SPECTRA_*` environment variables
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(long)]
    pub listen: Option<String>,

    /// Directory holding session data
    #[arg(long)]
    pub storage_root: Option<PathBuf>,

    /// Largest accepted upload in bytes
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Largest accepted band list
    #[arg(long)]
    pub max_bands: Option<usize>,

    /// Session lifetime in seconds
    #[arg(long)]
    pub session_ttl_secs: Option<u64>,

    /// Seconds between retention sweeps
    #[arg(long)]
    pub sweep_interval_secs: Option<u64>,

    /// Deadline for one processing request in seconds
    #[arg(long)]
    pub processing_timeout_secs: Option<u64>,

    /// Stem-separation command line, e.g. "python3 -m spleeter"
    #[arg(long)]
    pub separator: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ServiceConfig) {
        if let Some(listen) = &self.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(root) = &self.storage_root {
            config.storage_root = root.clone();
        }
        if let Some(bytes) = self.max_upload_bytes {
            config.max_upload_bytes = bytes;
        }
        if let Some(bands) = self.max_bands {
            config.max_bands = bands;
        }
        if let Some(ttl) = self.session_ttl_secs {
            config.session_ttl_secs = ttl;
        }
        if let Some(every) = self.sweep_interval_secs {
            config.sweep_interval_secs = every;
        }
        if let Some(timeout) = self.processing_timeout_secs {
            config.processing_timeout_secs = timeout;
        }
        if let Some(separator) = &self.separator {
            config.separator_program = Some(separator.clone());
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service (the default)
    #[command(name = "serve")]
    Serve,

    /// Equalize a WAV file offline
    #[command(name = "equalize")]
    Equalize {
        /// Input WAV file
        input: PathBuf,

        /// Where to write the processed WAV
        output: PathBuf,

        /// Band list as JSON, e.g. '[{"frequency": 1000, "gain": 6}]'
        #[arg(short, long)]
        bands: String,
    },

    /// Delete expired sessions once and exit
    #[command(name = "sweep")]
    Sweep,
}
