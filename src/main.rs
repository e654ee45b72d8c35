//! Layered Cache - client-side multi-layer cache with prefetching
//!
//! Runs the cache core as a local service for the app shell.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use layered_cache::api::create_router;
use layered_cache::{spawn_sweep_task, AppState, Config, PrefetchEngine};

/// Main entry point for the cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the durable store and build cache, prefetch engine and signal
/// 4. Start the fast-layer sweep task (unless disabled)
/// 5. Serve HTTP on the configured port
/// 6. On SIGINT/SIGTERM, stop the sweep and let pending prefetches settle
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "layered_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting layered cache service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_dir={}, durable_capacity={}, default_ttl={}ms, port={}, prefetch_max_concurrent={}, sweep_interval={}s",
        config.cache_dir.display(),
        config.durable_capacity,
        config.default_ttl_ms,
        config.server_port,
        config.prefetch_max_concurrent,
        config.sweep_interval
    );

    let state = AppState::from_config(&config)
        .await
        .context("failed to initialize cache state")?;
    info!("Cache layers initialized");

    let sweep_handle = config
        .sweep_interval()
        .map(|interval| spawn_sweep_task(state.cache.clone(), interval));

    let prefetch = state.prefetch.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle, prefetch))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops background work.
async fn shutdown_signal(sweep_handle: Option<JoinHandle<()>>, prefetch: PrefetchEngine) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
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

    if let Some(handle) = sweep_handle {
        handle.abort();
        warn!("Sweep task aborted");
    }

    info!(queued = prefetch.queue_len(), "Waiting for prefetch queue to drain");
    prefetch.wait_idle().await;
}
