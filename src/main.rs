//! Storefront Cache - caching gateway in front of the storefront REST backend
//!
//! Serves catalog reads from a two-tier cache and exposes cache administration.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::RwLock;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_cache::api::{create_router, AppState};
use storefront_cache::backend::RestClient;
use storefront_cache::cache::{DurableStorage, FileStorage, MemoryStorage, TieredCache};
use storefront_cache::clock::SystemClock;
use storefront_cache::{spawn_cleanup_task, CachedDataFacade, Config};

/// Main entry point for the storefront caching gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open durable storage and build the tiered cache (sweeps stale entries)
/// 4. Bind the facade to the REST backend
/// 5. Start background durable sweep and, if enabled, the preload
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting storefront cache gateway");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_memory_entries={}, default_ttl={}s, port={}, cleanup_interval={}s, version={}",
        config.max_memory_entries,
        config.default_ttl,
        config.server_port,
        config.cleanup_interval,
        config.cache_version
    );

    let storage: Box<dyn DurableStorage> = match FileStorage::open(config.storage_path()) {
        Ok(storage) => {
            info!("Durable tier at {}", storage.path().display());
            Box::new(storage)
        }
        Err(e) => {
            warn!("Durable storage unavailable, using in-process storage: {}", e);
            Box::new(MemoryStorage::new())
        }
    };
    let cache = Arc::new(RwLock::new(TieredCache::from_config(
        &config,
        storage,
        Arc::new(SystemClock),
    )));

    let mut client = RestClient::new(config.backend_url.clone());
    if let Some(token) = &config.backend_token {
        client = client.with_token(token.clone());
    }
    let facade = CachedDataFacade::new(cache.clone(), Arc::new(client));

    let cleanup_handle =
        spawn_cleanup_task(cache, Duration::from_secs(config.cleanup_interval));
    info!("Background sweep task started");

    if config.preload {
        // Status is observable through /stats
        let _ = facade.spawn_preload();
    }

    let app = create_router(AppState::new(facade));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the sweep task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Sweep task aborted");
}
