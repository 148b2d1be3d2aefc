//! smeta-brain library - consensus catalog service
//!
//! Backend for the cost-estimation dashboard: stores raw line items and
//! consensus items, and applies operator edits through the consensus engine.

use axum::Router;
use smeta_common::ConsensusConfig;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod store;

pub use error::{ApiError, ApiResult};
pub use store::BrainStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: BrainStore,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, consensus: ConsensusConfig) -> Self {
        Self {
            store: BrainStore::new(db, consensus),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::brain_routes())
        .merge(api::catalog_routes())
        .merge(api::raw_data_routes())
        .merge(api::analyze_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
