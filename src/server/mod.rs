//! HTTP surface
//!
//! Endpoints:
//! - `POST /api/apply-eq` - multipart `audio` + `eq_settings`, returns the session and processed URL
//! - `POST /api/extract-vocals` - multipart `audio`, returns the session and both stem URLs
//! - `GET /api/audio/:session_id/:kind` - streams a stored artifact as `audio/wav`
//! - `GET /health` - returns "ok"
//!
//! CPU-bound work runs on the blocking pool under a deadline; the async
//! executor only moves bytes.

mod handlers;
mod response;
mod sweeper;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::engine::WavCodec;
use crate::error::{Result, SpectraError};
use crate::pipeline::{Limits, Processor};
use crate::separation::{CommandSeparator, SeparationService, StemSeparator};
use crate::session::{FsSessionStore, SessionStore};

pub use response::ApiError;
pub use sweeper::spawn_sweeper;

/// Room for multipart boundaries and the band list on top of the audio itself
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn SessionStore>,
    processor: Arc<Processor>,
    separation: Arc<SeparationService>,
    limits: Limits,
    processing_timeout: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SessionStore>,
        separator: Option<Arc<dyn StemSeparator>>,
        limits: Limits,
        processing_timeout: Duration,
    ) -> Self {
        let processor = Processor::new(store.clone(), Arc::new(WavCodec::default()), limits);
        let separation = SeparationService::new(store.clone(), separator, limits);

        Self {
            store,
            processor: Arc::new(processor),
            separation: Arc::new(separation),
            limits,
            processing_timeout,
        }
    }

    /// Wire up the filesystem store and the configured separator
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let store: Arc<dyn SessionStore> = Arc::new(FsSessionStore::new(&config.storage_root)?);
        let separator = config
            .separator_program
            .as_deref()
            .and_then(CommandSeparator::from_command_line)
            .map(|s| Arc::new(s.with_timeout(config.processing_timeout())) as Arc<dyn StemSeparator>);

        if separator.is_none() {
            warn!("no separator configured; /api/extract-vocals will answer 503");
        }

        Ok(Self::new(
            store,
            separator,
            Limits::from(config),
            config.processing_timeout(),
        ))
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Run CPU-bound work on the blocking pool, bounded by the processing timeout
    ///
    /// On timeout the caller gets `Timeout` right away; the blocking task
    /// finishes in the background and its session is left for the sweeper.
    async fn run_blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::task::spawn_blocking(work);
        match tokio::time::timeout(self.processing_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(SpectraError::Transform {
                reason: format!("worker task failed: {}", join_error),
            }),
            Err(_) => Err(SpectraError::Timeout {
                timeout_secs: self.processing_timeout.as_secs(),
            }),
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.limits.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/apply-eq", post(handlers::apply_eq))
        .route("/api/extract-vocals", post(handlers::extract_vocals))
        .route("/api/audio/:session_id/:kind", get(handlers::get_audio))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(response::allow_any_origin))
        .with_state(state)
}

/// Bind, start the retention sweeper and serve until Ctrl-C
pub async fn run_server(config: ServiceConfig) -> Result<()> {
    config.validate()?;
    let addr = config.socket_addr()?;
    let state = AppState::from_config(&config)?;

    let sweeper = spawn_sweeper(
        state.store().clone(),
        config.session_ttl(),
        config.sweep_interval(),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        storage_root = %config.storage_root.display(),
        "spectra HTTP server listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(timeout: Duration) -> (tempfile::TempDir, AppState) {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(FsSessionStore::new(temp.path()).unwrap());
        (temp, AppState::new(store, None, Limits::default(), timeout))
    }

    #[tokio::test]
    async fn test_run_blocking_returns_result() {
        let (_temp, state) = state(Duration::from_secs(5));
        let value = state.run_blocking(|| Ok(21 * 2)).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_blocking_times_out() {
        let (_temp, state) = state(Duration::from_millis(20));
        let result = state
            .run_blocking(|| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(SpectraError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_run_blocking_panic_is_internal_error() {
        let (_temp, state) = state(Duration::from_secs(5));
        let result: Result<()> = state.run_blocking(|| panic!("boom")).await;
        assert!(matches!(result, Err(SpectraError::Transform { .. })));
    }

    #[test]
    fn test_from_config_without_separator() {
        let temp = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            storage_root: temp.path().join("sessions"),
            ..Default::default()
        };
        let state = AppState::from_config(&config).unwrap();
        assert!(!state.separation.is_available());
        assert!(temp.path().join("sessions").is_dir());
    }
}
