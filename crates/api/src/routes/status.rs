//! Dispatcher status endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/status", get(status))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub subscriptions: usize,
    pub dispatch_interval_secs: u64,
    pub send_delay_ms: u64,
}

/// GET /api/status — Active subscription count and dispatch tunables.
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        subscriptions: state.registry.count().await,
        dispatch_interval_secs: state.config.dispatch_interval_secs,
        send_delay_ms: state.config.dispatch_send_delay_ms,
    })
}
