//! Stateless consensus calculation
//!
//! Lets the dashboard preview an analysis without touching the store.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use smeta_common::consensus::{try_compute_analysis, Dimension, PriceAnalysis};

use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub dimension: Dimension,
    #[serde(default)]
    pub prices: Vec<f64>,
}

/// POST /api/analyze
///
/// **Request:** `{"dimension": "material", "prices": [100, 200, 300, 1000]}`
/// **Response:** the `PriceAnalysis` record
///
/// **Errors:**
/// - 400 Bad Request: negative price
pub async fn analyze_prices(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<PriceAnalysis>> {
    let analysis = try_compute_analysis(request.dimension, &request.prices, state.store.config())?;
    Ok(Json(analysis))
}

pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/api/analyze", post(analyze_prices))
}
