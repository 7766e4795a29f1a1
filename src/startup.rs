//! Application startup: tracing, background tasks, listener and shutdown.

use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::middleware::MemoryStore;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Production emits JSON lines,
/// development a human-readable layout.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| anyhow::anyhow!("Invalid LOG_LEVEL '{}': {}", config.log_level, e))?,
    };

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.environment.is_development() {
        subscriber.pretty().try_init()
    } else {
        subscriber.json().try_init()
    };

    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

/// Drop rate-limit entries whose window has closed, once per window.
pub fn spawn_rate_limit_pruner(store: Arc<MemoryStore>) -> tokio::task::JoinHandle<()> {
    let period = store.window();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = store.prune_expired(Instant::now());
            if removed > 0 {
                debug!(removed, remaining = store.len(), "Pruned expired rate-limit entries");
            }
        }
    })
}

/// Bind the listener and serve `app` until a shutdown signal arrives.
pub async fn serve(config: &Config, app: Router) -> Result<()> {
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    info!(
        address = %addr,
        environment = %config.environment,
        "Gateway listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal.
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully");
        },
    }
}
