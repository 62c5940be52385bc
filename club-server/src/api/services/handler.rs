//! Service API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{Service, ServiceCreate, ServiceUpdate};
use validator::Validate;

use crate::core::ServerState;
use crate::db::repository::catalog;
use crate::utils::AppResult;

/// GET /api/services
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Service>>> {
    Ok(Json(catalog::find_all::<Service>(&state.storage)?))
}

/// GET /api/services/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Service>> {
    Ok(Json(catalog::find_by_id::<Service>(&state.storage, id)?))
}

/// POST /api/services
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ServiceCreate>,
) -> AppResult<Json<Service>> {
    payload.validate()?;
    Ok(Json(catalog::create_service(&state.storage, payload)?))
}

/// PUT /api/services/{id}
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(payload): Json<ServiceUpdate>,
) -> AppResult<Json<Service>> {
    payload.validate()?;
    Ok(Json(catalog::update_service(&state.storage, id, payload)?))
}

/// DELETE /api/services/{id}, refused while referenced
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<bool>> {
    catalog::delete::<Service>(&state.storage, id)?;
    Ok(Json(true))
}
