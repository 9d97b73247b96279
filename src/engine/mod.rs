//! Audio Engine Module
//!
//! Core audio types shared by every processing path:
//! - Audio buffer management
//! - WAV encode/decode

pub mod buffer;
pub mod io;

pub use buffer::{calculate_rms, db_to_linear, generate_test_tone, rms_linear, AudioBuffer};
pub use io::{AudioCodec, WavCodec};
