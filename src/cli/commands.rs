//! CLI Command Implementations

use std::fs;
use std::path::Path;

use chrono::Utc;
use tracing::info;

use crate::config::ServiceConfig;
use crate::dsp::{equalize_buffer, parse_bands};
use crate::engine::{calculate_rms, AudioCodec, WavCodec};
use crate::error::Result;
use crate::session::{EvictionReport, FsSessionStore, SessionStore};

/// Equalize a WAV file without going through a session.
pub fn equalize_file(input: &Path, output: &Path, bands_json: &str, max_bands: usize) -> Result<()> {
    let bands = parse_bands(bands_json, max_bands)?;
    let codec = WavCodec::default();

    let buffer = codec.decode(&fs::read(input)?)?;
    info!(
        input = %input.display(),
        channels = buffer.num_channels(),
        sample_rate = buffer.sample_rate,
        duration_secs = buffer.duration_secs(),
        "equalizing file"
    );

    let processed = equalize_buffer(&buffer, &bands)?;
    fs::write(output, codec.encode(&processed)?)?;

    println!("Wrote: {}", output.display());
    println!(
        "RMS: {:.4} -> {:.4}",
        calculate_rms(&buffer),
        calculate_rms(&processed)
    );
    Ok(())
}

/// Run one retention sweep over the configured storage root.
pub fn sweep(config: &ServiceConfig) -> Result<EvictionReport> {
    let store = FsSessionStore::new(&config.storage_root)?;
    let report = store.evict_expired(config.session_ttl(), Utc::now())?;

    println!(
        "Removed {} session(s), freed {} bytes",
        report.sessions_removed, report.bytes_freed
    );
    Ok(report)
}
