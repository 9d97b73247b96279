//! Spectra - Session-Scoped Spectral Equalization Service
//!
//! Spectra accepts uploaded audio, reshapes its spectrum with a set of
//! Gaussian-weighted gain bands, and keeps every result in an isolated
//! session that clients retrieve by id. Vocal/instrumental separation is
//! delegated to an external tool and stored the same way.
//!
//! # Architecture
//!
//! - `engine`: planar audio buffers and the WAV codec
//! - `dsp`: band descriptors and the FFT-domain equalizer
//! - `session`: per-request storage with retention
//! - `pipeline` / `separation`: orchestrators tying the above together
//! - `server`: the axum HTTP surface

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod separation;
pub mod server;
pub mod session;

pub use error::{Result, SpectraError};
