//! Session Management Module
//!
//! A session is the storage namespace of one request. Sessions are addressed
//! by an opaque [`SessionId`] and hold at most one artifact per
//! [`ArtifactKind`]. Only the store knows how sessions map onto disk.

mod store;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SpectraError};

pub use store::{EvictionReport, FsSessionStore, SessionMeta, SessionStore};

/// Opaque session identifier (random 128-bit UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Mint a fresh identifier from the OS random source
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = SpectraError;

    /// Only canonical UUIDs parse, so a session id can never smuggle path
    /// separators or `..` into a storage location.
    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(SessionId)
            .map_err(|_| SpectraError::validation(format!("'{}' is not a session id", s)))
    }
}

/// Named artifacts a session can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// The upload as received
    Input,
    /// Equalizer output
    Processed,
    /// Vocal stem from the separator
    Vocals,
    /// Accompaniment stem from the separator
    Instrumental,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Input,
        ArtifactKind::Processed,
        ArtifactKind::Vocals,
        ArtifactKind::Instrumental,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Processed => "processed",
            Self::Vocals => "vocals",
            Self::Instrumental => "instrumental",
        }
    }

    /// File name of this artifact inside a session namespace
    pub(crate) fn file_name(&self) -> &'static str {
        match self {
            Self::Input => "input.wav",
            Self::Processed => "processed.wav",
            Self::Vocals => "vocals.wav",
            Self::Instrumental => "instrumental.wav",
        }
    }

    /// Whether clients may fetch this kind through retrieval
    pub fn is_retrievable(&self) -> bool {
        !matches!(self, Self::Input)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = SpectraError;

    fn from_str(s: &str) -> Result<Self> {
        ArtifactKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| SpectraError::validation(format!("Invalid track type: {}", s)))
    }
}
