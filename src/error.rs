//! Error handling for Spectra
//!
//! Every failure the service can report maps onto one variant here. The HTTP
//! layer turns these into status codes; nothing else inspects error strings.

use thiserror::Error;

/// Result type alias for Spectra operations
pub type Result<T> = std::result::Result<T, SpectraError>;

/// Main error type for Spectra operations
#[derive(Error, Debug)]
pub enum SpectraError {
    // Request Errors
    #[error("Invalid request: {reason}")]
    Validation { reason: String },

    #[error("Invalid audio: {reason}")]
    Decode {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Processing Errors
    #[error("Transform failed: {reason}")]
    Transform { reason: String },

    #[error("Processing timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // Storage Errors
    #[error("Not found: {what}")]
    NotFound { what: String },

    // Separation Errors
    #[error("Stem separation unavailable: {reason}")]
    SeparationUnavailable { reason: String },

    #[error("Stem separation failed: {reason}")]
    SeparationFailed { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SpectraError {
    /// Shorthand for a validation failure
    pub fn validation(reason: impl Into<String>) -> Self {
        SpectraError::Validation {
            reason: reason.into(),
        }
    }

    /// Shorthand for a missing session or artifact
    pub fn not_found(what: impl Into<String>) -> Self {
        SpectraError::NotFound { what: what.into() }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SpectraError::Validation { .. } => "VALIDATION_ERROR",
            SpectraError::Decode { .. } => "DECODE_ERROR",
            SpectraError::Transform { .. } => "TRANSFORM_ERROR",
            SpectraError::Timeout { .. } => "TIMEOUT",
            SpectraError::NotFound { .. } => "NOT_FOUND",
            SpectraError::SeparationUnavailable { .. } => "SEPARATION_UNAVAILABLE",
            SpectraError::SeparationFailed { .. } => "SEPARATION_FAILED",
            SpectraError::Io(_) => "IO_ERROR",
            SpectraError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns true if retrying the same request may succeed.
    ///
    /// Validation, decode and transform failures are deterministic in their
    /// input, so they never qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SpectraError::NotFound { .. }
                | SpectraError::Timeout { .. }
                | SpectraError::SeparationUnavailable { .. }
                | SpectraError::Io(_)
        )
    }

    /// Check if this error is caused by the caller rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SpectraError::Validation { .. }
                | SpectraError::Decode { .. }
                | SpectraError::NotFound { .. }
        )
    }
}
