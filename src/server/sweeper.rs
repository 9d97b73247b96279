//! Background retention sweep

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::session::SessionStore;

/// Periodically delete sessions older than `ttl`
///
/// The first sweep runs immediately, which clears leftovers from a previous
/// run of the server.
pub fn spawn_sweeper(store: Arc<dyn SessionStore>, ttl: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let store = store.clone();
            let sweep = tokio::task::spawn_blocking(move || store.evict_expired(ttl, Utc::now()));
            match sweep.await {
                Ok(Ok(report)) if report.sessions_removed > 0 => info!(
                    sessions_removed = report.sessions_removed,
                    bytes_freed = report.bytes_freed,
                    "retention sweep"
                ),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(error = %e, "retention sweep failed"),
                Err(e) => warn!(error = %e, "retention sweep task aborted"),
            }
        }
    })
}
