//! Session Storage
//!
//! Filesystem-backed session store. Layout under the storage root:
//!
//! ```text
//! <root>/<session-id>/session.json      metadata (creation time)
//! <root>/<session-id>/<kind>.wav        one file per artifact kind
//! <root>/<session-id>/work/             scratch space for external tools
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{ArtifactKind, SessionId};
use crate::error::{Result, SpectraError};

const META_FILE: &str = "session.json";
const SCRATCH_DIR: &str = "work";
const CREATE_ATTEMPTS: usize = 4;

/// Storage backend for session artifacts
///
/// Implementations must be safe to share between concurrent requests:
/// `create_session` never hands out the same id twice, and distinct sessions
/// never alias the same storage location.
pub trait SessionStore: Send + Sync {
    /// Mint a fresh session with an empty namespace
    fn create_session(&self) -> Result<SessionId>;

    /// Persist `bytes` as `kind`, replacing any previous artifact of that kind
    fn write_artifact(&self, session: &SessionId, kind: ArtifactKind, bytes: &[u8]) -> Result<()>;

    /// Move a file produced elsewhere (e.g. by an external tool) into the
    /// session as `kind`
    fn import_artifact(&self, session: &SessionId, kind: ArtifactKind, source: &Path)
        -> Result<()>;

    /// Load an artifact fully into memory
    fn read_artifact(&self, session: &SessionId, kind: ArtifactKind) -> Result<Vec<u8>>;

    /// Location of an existing artifact, for streaming it without loading it
    fn resolve_path(&self, session: &SessionId, kind: ArtifactKind) -> Result<PathBuf>;

    /// Scratch directory inside the session namespace, created on demand
    fn scratch_dir(&self, session: &SessionId) -> Result<PathBuf>;

    /// Remove every session created more than `ttl` before `now`
    fn evict_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Result<EvictionReport>;
}

/// Metadata stored with each session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    /// The session this file belongs to.
    pub id: SessionId,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Number of sessions removed.
    pub sessions_removed: usize,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

/// Session store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsSessionStore {
    root: PathBuf,
}

impl FsSessionStore {
    /// Open (and create if needed) a store at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Get the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.root.join(session.to_string())
    }

    /// Session directory, or `NotFound` if the session does not exist.
    fn existing_session_dir(&self, session: &SessionId) -> Result<PathBuf> {
        let dir = self.session_dir(session);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(SpectraError::not_found(format!("session {}", session)))
        }
    }

    /// Load a session's metadata.
    pub fn load_meta(&self, session: &SessionId) -> Result<SessionMeta> {
        let path = self.existing_session_dir(session)?.join(META_FILE);
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn created_at(&self, dir: &Path) -> Option<DateTime<Utc>> {
        let from_meta = fs::read_to_string(dir.join(META_FILE))
            .ok()
            .and_then(|content| serde_json::from_str::<SessionMeta>(&content).ok())
            .map(|meta| meta.created_at);

        // Sessions interrupted before their metadata landed fall back to the
        // directory timestamp.
        from_meta.or_else(|| {
            fs::metadata(dir)
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Utc>::from)
        })
    }
}

impl SessionStore for FsSessionStore {
    fn create_session(&self) -> Result<SessionId> {
        for _ in 0..CREATE_ATTEMPTS {
            let id = SessionId::new();
            let dir = self.session_dir(&id);

            // create_dir (not create_dir_all) fails on an existing directory,
            // so a colliding id can never adopt another session's namespace.
            match fs::create_dir(&dir) {
                Ok(()) => {
                    let meta = SessionMeta {
                        id,
                        created_at: Utc::now(),
                    };
                    fs::write(dir.join(META_FILE), serde_json::to_string_pretty(&meta)?)?;
                    debug!(session = %id, "created session");
                    return Ok(id);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!(session = %id, "session id collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SpectraError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "could not allocate a unique session directory",
        )))
    }

    fn write_artifact(&self, session: &SessionId, kind: ArtifactKind, bytes: &[u8]) -> Result<()> {
        let dir = self.existing_session_dir(session)?;
        let target = dir.join(kind.file_name());
        let partial = dir.join(format!("{}.partial", kind.file_name()));

        // Write-then-rename so a polling reader never sees a half-written file
        fs::write(&partial, bytes)?;
        fs::rename(&partial, &target)?;

        debug!(session = %session, kind = %kind, size = bytes.len(), "wrote artifact");
        Ok(())
    }

    fn import_artifact(
        &self,
        session: &SessionId,
        kind: ArtifactKind,
        source: &Path,
    ) -> Result<()> {
        let dir = self.existing_session_dir(session)?;
        if !source.is_file() {
            return Err(SpectraError::not_found(format!(
                "{} output at {}",
                kind,
                source.display()
            )));
        }

        let target = dir.join(kind.file_name());
        if fs::rename(source, &target).is_err() {
            // Cross-device moves need a copy
            let partial = dir.join(format!("{}.partial", kind.file_name()));
            fs::copy(source, &partial)?;
            fs::rename(&partial, &target)?;
            fs::remove_file(source)?;
        }

        debug!(session = %session, kind = %kind, "imported artifact");
        Ok(())
    }

    fn read_artifact(&self, session: &SessionId, kind: ArtifactKind) -> Result<Vec<u8>> {
        let path = self.resolve_path(session, kind)?;
        Ok(fs::read(path)?)
    }

    fn resolve_path(&self, session: &SessionId, kind: ArtifactKind) -> Result<PathBuf> {
        let path = self.existing_session_dir(session)?.join(kind.file_name());
        if path.is_file() {
            Ok(path)
        } else {
            Err(SpectraError::not_found(format!(
                "{} artifact for session {}",
                kind, session
            )))
        }
    }

    fn scratch_dir(&self, session: &SessionId) -> Result<PathBuf> {
        let dir = self.existing_session_dir(session)?.join(SCRATCH_DIR);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn evict_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Result<EvictionReport> {
        let mut report = EvictionReport::default();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();

            // Anything that is not a session directory is left alone
            let is_session = path.is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.parse::<SessionId>().is_ok());
            if !is_session {
                continue;
            }

            let Some(created_at) = self.created_at(&path) else {
                continue;
            };
            // A creation time in the future gives a negative age, which never expires
            match now.signed_duration_since(created_at).to_std() {
                Ok(age) if age > ttl => {}
                _ => continue,
            }

            let size: u64 = WalkDir::new(&path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter_map(|e| e.metadata().ok())
                .filter(|m| m.is_file())
                .map(|m| m.len())
                .sum();

            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    report.sessions_removed += 1;
                    report.bytes_freed += size;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to evict session"),
            }
        }

        Ok(report)
    }
}
