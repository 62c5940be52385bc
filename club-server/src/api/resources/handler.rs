//! Resource API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{Resource, ResourceCreate, ResourceUpdate};
use validator::Validate;

use crate::core::ServerState;
use crate::db::repository::catalog;
use crate::utils::AppResult;

/// GET /api/resources
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Resource>>> {
    Ok(Json(catalog::find_all::<Resource>(&state.storage)?))
}

/// GET /api/resources/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Resource>> {
    Ok(Json(catalog::find_by_id::<Resource>(&state.storage, id)?))
}

/// POST /api/resources
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ResourceCreate>,
) -> AppResult<Json<Resource>> {
    payload.validate()?;
    Ok(Json(catalog::create_resource(&state.storage, payload)?))
}

/// PUT /api/resources/{id}
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(payload): Json<ResourceUpdate>,
) -> AppResult<Json<Resource>> {
    payload.validate()?;
    Ok(Json(catalog::update_resource(&state.storage, id, payload)?))
}

/// DELETE /api/resources/{id}, refused while referenced
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<bool>> {
    catalog::delete::<Resource>(&state.storage, id)?;
    Ok(Json(true))
}
