//! Raw record endpoints
//!
//! Single-source line items; no consensus is computed for them.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use smeta_common::consensus::{RawRecord, RawRecordFields};
use uuid::Uuid;

use crate::{ApiResult, AppState};

/// GET /api/raw_data
pub async fn list_records(State(state): State<AppState>) -> ApiResult<Json<Vec<RawRecord>>> {
    Ok(Json(state.store.list_raw_records().await?))
}

/// POST /api/raw_data
///
/// Ingestion contract: one extracted line item with its source document.
pub async fn add_record(
    State(state): State<AppState>,
    Json(fields): Json<RawRecordFields>,
) -> ApiResult<Json<RawRecord>> {
    Ok(Json(state.store.add_raw_record(fields).await?))
}

/// POST /api/raw_data/:id/edit
///
/// **Errors:**
/// - 400 Bad Request: empty name, or both prices zero
/// - 404 Not Found: record does not exist
pub async fn edit_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(fields): Json<RawRecordFields>,
) -> ApiResult<Json<RawRecord>> {
    Ok(Json(state.store.edit_raw_record(id, fields).await?))
}

pub fn raw_data_routes() -> Router<AppState> {
    Router::new()
        .route("/api/raw_data", get(list_records).post(add_record))
        .route("/api/raw_data/:id/edit", post(edit_record))
}
