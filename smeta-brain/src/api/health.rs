//! Health check endpoint
//!
//! Always answers 200 so monitoring can tell a running service with a broken
//! database apart from a dead one; `status` carries the difference.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::error;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the database does not answer
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub git_hash: &'static str,
    pub database: bool,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            error!("Health check: database unavailable: {}", e);
            false
        }
    };

    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        module: "smeta-brain",
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        database,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
