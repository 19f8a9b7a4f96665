pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::Result;

pub use handlers::ClassificationResponse;
pub use state::{AppContext, CategoryShare, DatasetOverview};

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/go", get(handlers::go))
        .route("/api/classify", post(handlers::classify))
        .route("/api/overview", get(handlers::overview))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Serves until Ctrl+C.
pub async fn serve(ctx: Arc<AppContext>, bind_addr: &str) -> Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    tracing::info!("  - GET  /health");
    tracing::info!("  - GET  /go?query=...");
    tracing::info!("  - POST /api/classify");
    tracing::info!("  - GET  /api/overview");

    axum::serve(listener, build_router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
