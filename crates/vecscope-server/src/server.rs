//! Router construction and the serve loop.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vecscope_core::config::ServerConfig;
use vecscope_index::RetrievalIndex;

use crate::routes::{data, health, not_found, query};
use crate::state::AppState;

/// Build the Axum router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let cors = if state.enable_cors {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/data", get(data::get_data))
        .route("/api/query", post(query::project_query))
        .route("/api/neighbors", post(query::find_neighbors))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `index` until Ctrl+C or SIGTERM.
pub async fn serve(config: &ServerConfig, index: Arc<RetrievalIndex>) -> anyhow::Result<()> {
    let addr: SocketAddr = config.bind_addr().parse().with_context(|| format!("invalid bind address {}", config.bind_addr()))?;
    let state = AppState::new(index, config);
    tracing::info!(
        %addr,
        chunks = state.index.len(),
        method = %state.index.method(),
        dims = state.index.dims(),
        cors = config.enable_cors,
        timeout_ms = config.query_timeout_ms,
        "starting vecscope server"
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
