//! Health and status endpoints served alongside the bot.

pub mod routes;
pub mod state;

use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::routes::create_router;
use crate::state::AppState;

/// Serve the router on `state.config.health_addr` until `shutdown` is cancelled.
pub async fn serve(state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = state.config.health_addr;
    let app = create_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Health server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Health server stopped");
    Ok(())
}
