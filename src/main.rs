mod config;
mod continuity;
mod error;
mod handlers;
mod impact;
mod migrate;
mod models;
mod router;
mod storage;
mod store;

use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use storage::SqliteBackend;
use store::TopologyStore;

/// Application state shared across handlers
pub struct AppState {
    pub store: TopologyStore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fiberplant=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let cfg = Config::load();
    tracing::info!("Starting Fiberplant Server");
    tracing::info!("Database: {}", cfg.db_path);
    tracing::info!("Project: {}", cfg.project_id);
    tracing::info!("Listen: {}", cfg.listen_addr);

    // Initialize database
    let backend = SqliteBackend::with_pool_size(&cfg.db_path, cfg.db_max_connections).await?;
    tracing::info!("Database initialized (pool_size={})", cfg.db_max_connections);

    // Load the topology; the integrity pass runs before the first request
    let store = TopologyStore::load(cfg.project_id.clone(), Arc::new(backend))
        .await
        .map_err(|e| anyhow::anyhow!("failed to load topology: {}", e))?;
    tracing::info!(
        "Topology loaded: {} node(s), {} connection(s)",
        store.nodes().await.len(),
        store.connections().await.len()
    );

    // Create app state
    let state = Arc::new(AppState { store });

    // Build router
    let app = router::build(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("Fiberplant listening on {}", cfg.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Fiberplant shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
