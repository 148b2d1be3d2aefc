//! Catalog exchange and maintenance endpoints
//!
//! The catalog travels as CSV with the columns
//! `name,unit,material_price,work_price,cluster_size,sources`.

use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::Serialize;
use smeta_common::consensus::CatalogRow;
use smeta_common::{Error, Result};

use crate::store::ClearedCounts;
use crate::{ApiResult, AppState};

/// Download file name for exports
pub const EXPORT_FILE_NAME: &str = "brain_export.csv";

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
}

/// Encode rows as CSV with a header line
pub fn write_csv(rows: &[CatalogRow]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| Error::Internal(format!("Failed to write catalog row: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("Failed to finish catalog export: {}", e)))
}

/// Decode uploaded CSV; the `name` column is required, the rest optional
pub fn read_csv(data: &[u8]) -> Result<Vec<CatalogRow>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| Error::Validation(format!("Unreadable catalog header: {}", e)))?;
    if !headers.iter().any(|h| h == "name") {
        return Err(Error::Validation("Missing required column: name".to_string()));
    }

    let mut rows = Vec::new();
    for (index, result) in reader.deserialize().enumerate() {
        let row: CatalogRow = result
            .map_err(|e| Error::Validation(format!("Catalog row {}: {}", index + 1, e)))?;
        rows.push(row);
    }
    Ok(rows)
}

/// GET /api/brain/export
///
/// **Errors:**
/// - 400 Bad Request: catalog is empty
pub async fn export_catalog(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let rows = state.store.export_catalog().await?;
    let body = write_csv(&rows)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        body,
    ))
}

/// POST /api/brain/import
///
/// **Request:** CSV body in the export format. Replaces the whole catalog.
///
/// **Errors:**
/// - 400 Bad Request: no `name` column, a malformed or negative price, or
///   no row with a name and a positive price
pub async fn import_catalog(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ImportResponse>> {
    let rows = read_csv(&body)?;
    let imported = state.store.import_catalog(&rows).await?;
    Ok(Json(ImportResponse { imported }))
}

/// POST /api/clear_data
///
/// Deletes every raw record and every catalog item. Executes unconditionally;
/// confirmation belongs to the caller.
pub async fn clear_data(State(state): State<AppState>) -> ApiResult<Json<ClearedCounts>> {
    Ok(Json(state.store.clear_all().await?))
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/brain/export", get(export_catalog))
        .route("/api/brain/import", post(import_catalog))
        .route("/api/clear_data", post(clear_data))
}
