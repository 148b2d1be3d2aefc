//! Consensus catalog ("brain") endpoints
//!
//! Items are addressed by their stable guid, never by list position, so an
//! edit cannot land on a neighbour after a concurrent delete.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use smeta_common::consensus::{item_shows_warning, ConsensusItem, Dimension, ItemEdit, NewItem};
use uuid::Uuid;

use crate::{ApiResult, AppState};

/// Item as displayed, with warning flags already resolved against approval
#[derive(Debug, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: ConsensusItem,
    pub show_material_warning: bool,
    pub show_work_warning: bool,
}

impl From<ConsensusItem> for ItemView {
    fn from(item: ConsensusItem) -> Self {
        Self {
            show_material_warning: item_shows_warning(&item, Dimension::Material),
            show_work_warning: item_shows_warning(&item, Dimension::Work),
            item,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClusterRequest {
    pub record_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RemovePriceRequest {
    pub dimension: Dimension,
    pub price_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub dimension: Dimension,
    pub approved: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: Uuid,
}

/// GET /api/brain
pub async fn list_items(State(state): State<AppState>) -> ApiResult<Json<Vec<ItemView>>> {
    let items = state.store.list_items().await?;
    Ok(Json(items.into_iter().map(ItemView::from).collect()))
}

/// GET /api/brain/:id
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ItemView>> {
    Ok(Json(state.store.get_item(id).await?.into()))
}

/// POST /api/brain
///
/// Entry point for the upstream clustering step: observed prices per
/// dimension plus cluster metadata.
pub async fn create_item(
    State(state): State<AppState>,
    Json(new_item): Json<NewItem>,
) -> ApiResult<Json<ItemView>> {
    Ok(Json(state.store.create_item(new_item).await?.into()))
}

/// POST /api/brain/cluster
///
/// **Request:** `{"record_ids": ["<guid>", ...]}`
pub async fn create_from_cluster(
    State(state): State<AppState>,
    Json(request): Json<ClusterRequest>,
) -> ApiResult<Json<ItemView>> {
    Ok(Json(state.store.create_from_cluster(&request.record_ids).await?.into()))
}

/// POST /api/brain/:id/remove_price
///
/// **Request:** `{"dimension": "material", "price_index": 0}`
///
/// **Errors:**
/// - 400 Bad Request: index outside the observed prices
/// - 404 Not Found: item does not exist
pub async fn remove_price(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RemovePriceRequest>,
) -> ApiResult<Json<ItemView>> {
    let item = state
        .store
        .remove_price(id, request.dimension, request.price_index)
        .await?;
    Ok(Json(item.into()))
}

/// POST /api/brain/:id/approve
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApproveRequest>,
) -> ApiResult<Json<ItemView>> {
    let item = state
        .store
        .approve(id, request.dimension, request.approved)
        .await?;
    Ok(Json(item.into()))
}

/// POST /api/brain/:id/edit
///
/// **Errors:**
/// - 400 Bad Request: empty name, or both prices zero
pub async fn edit_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(edit): Json<ItemEdit>,
) -> ApiResult<Json<ItemView>> {
    Ok(Json(state.store.edit_item(id, edit).await?.into()))
}

/// DELETE /api/brain/:id
///
/// Executes unconditionally; confirmation belongs to the caller.
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    state.store.delete_item(id).await?;
    Ok(Json(DeleteResponse { deleted: id }))
}

pub fn brain_routes() -> Router<AppState> {
    Router::new()
        .route("/api/brain", get(list_items).post(create_item))
        .route("/api/brain/cluster", post(create_from_cluster))
        .route("/api/brain/:id", get(get_item).delete(delete_item))
        .route("/api/brain/:id/remove_price", post(remove_price))
        .route("/api/brain/:id/approve", post(approve))
        .route("/api/brain/:id/edit", post(edit_item))
}
