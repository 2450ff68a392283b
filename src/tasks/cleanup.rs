//! Durable Tier Sweep Task
//!
//! Background task that periodically removes expired and version-mismatched
//! entries from the durable tier.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::TieredCache;

/// Spawns a background task that periodically sweeps the durable tier.
///
/// The task sleeps for the interval between sweeps and takes the cache's
/// write lock only for the sweep itself. The sweep at construction of
/// [`TieredCache`] covers startup, so the first sweep here happens one
/// interval in.
///
/// # Arguments
/// * `cache` - Shared reference to the cache
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_cleanup_task(cache: Arc<RwLock<TieredCache>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting durable cache sweep task with interval of {:?}",
            interval
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.write().await.sweep_durable();

            if removed > 0 {
                info!("Durable sweep: removed {} stale entries", removed);
            } else {
                debug!("Durable sweep: nothing to remove");
            }
        }
    })
}
