//! HTTP API server for a cluster-pruning index.

pub mod routes;

use crate::config::IndexConfig;
use crate::handle::IndexHandle;
use crate::metrics::MetricsCollector;
use crate::storage::StoredIndex;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Shared application state for the HTTP server.
pub struct AppState {
    pub index: IndexHandle<StoredIndex>,
    pub metrics: RwLock<MetricsCollector>,
    pub config: IndexConfig,
}

impl AppState {
    pub fn new(initial: StoredIndex, config: IndexConfig) -> Self {
        Self {
            index: IndexHandle::new(initial),
            metrics: RwLock::new(MetricsCollector::new()),
            config,
        }
    }
}

/// Start the HTTP server. An empty `initial` index answers searches with
/// `EmptyIndex` until the first rebuild.
pub async fn start(addr: &str, initial: StoredIndex, config: IndexConfig) -> anyhow::Result<()> {
    let vectors = initial.len();
    let kind = initial.kind();
    let state = Arc::new(AppState::new(initial, config));

    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, kind, vectors, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
