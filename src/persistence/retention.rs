//! Retention service for time-based record purge.
//!
//! Runs as a background task deleting stopped and errored process
//! records older than the configured window. Running records are never
//! purged.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::persistence::ProcessStore;
use crate::Result;

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Spawn the retention purge background task.
///
/// The task runs hourly until the `CancellationToken` fires. Each tick
/// deletes records with status in {stopped, error} whose `stopped_at`
/// is older than `retention_days`.
#[must_use]
pub fn spawn_retention_task(
    store: Arc<dyn ProcessStore>,
    retention_days: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("retention task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(err) = purge_once(store.as_ref(), retention_days).await {
                        error!(?err, "retention purge failed");
                    }
                }
            }
        }
    })
}

/// Run one purge pass.
///
/// # Errors
///
/// Returns `AppError::Store` when the delete fails.
pub async fn purge_once(store: &dyn ProcessStore, retention_days: u32) -> Result<u64> {
    let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
    let purged = store.purge_stopped_before(cutoff).await?;
    if purged > 0 {
        info!(purged, retention_days, "retention purge completed");
    }
    Ok(purged)
}
