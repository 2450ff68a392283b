//! Startup preload.
//!
//! Warms the volatile tier with the catalog, categories and settings. The
//! outcome is recorded as a [`PreloadStatus`] rather than returned as an error.

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{CachedDataFacade, FetchOptions, Params};

/// Outcome of the startup preload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PreloadStatus {
    /// Not started
    Pending,
    Running,
    /// Every resource loaded
    Completed,
    /// At least one resource failed; each failure names the resource
    Failed { failures: Vec<String> },
}

impl CachedDataFacade {
    /// Loads products, categories and settings in parallel into memory.
    ///
    /// Failures are logged and recorded in the returned status; they never
    /// abort the other loads.
    pub async fn preload(&self) -> PreloadStatus {
        *self.preload_status.write().await = PreloadStatus::Running;
        info!("Preloading products, categories and settings");

        let options = FetchOptions::memory_only();
        let (products, categories, settings) = tokio::join!(
            self.fetch_products(Params::new(), options),
            self.fetch_categories(options),
            self.fetch_settings(options),
        );

        let failures: Vec<String> = [
            ("products", products),
            ("categories", categories),
            ("settings", settings),
        ]
        .into_iter()
        .filter_map(|(name, result)| result.err().map(|e| format!("{}: {}", name, e)))
        .collect();

        let status = if failures.is_empty() {
            info!("Preload completed");
            PreloadStatus::Completed
        } else {
            warn!("Preload finished with failures: {}", failures.join("; "));
            PreloadStatus::Failed { failures }
        };

        *self.preload_status.write().await = status.clone();
        status
    }

    /// Runs [`preload`](Self::preload) in the background.
    pub fn spawn_preload(&self) -> JoinHandle<PreloadStatus> {
        let facade = self.clone();
        tokio::spawn(async move { facade.preload().await })
    }

    pub async fn preload_status(&self) -> PreloadStatus {
        self.preload_status.read().await.clone()
    }
}
