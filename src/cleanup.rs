//! Periodic removal of dead refresh-token rows.

use std::time::Duration;
use tracing::{error, info};

use crate::db::SqliteStore;

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub async fn run_cleanup(store: &SqliteStore) {
    match store.purge_refresh_tokens().await {
        Ok(count) if count > 0 => info!(count, "Purged expired or revoked refresh tokens"),
        Ok(_) => {}
        Err(e) => error!(error = %e, "Failed to purge refresh tokens"),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// The first tick fires immediately.
pub fn spawn_cleanup_scheduler(store: SqliteStore) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&store).await;
        }
    })
}
