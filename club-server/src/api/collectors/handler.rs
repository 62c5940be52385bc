//! Collector API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{Collector, CollectorCreate, CollectorUpdate};
use validator::Validate;

use crate::core::ServerState;
use crate::db::repository::catalog;
use crate::utils::AppResult;

/// GET /api/collectors
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Collector>>> {
    Ok(Json(catalog::find_all::<Collector>(&state.storage)?))
}

/// GET /api/collectors/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Collector>> {
    Ok(Json(catalog::find_by_id::<Collector>(&state.storage, id)?))
}

/// POST /api/collectors
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CollectorCreate>,
) -> AppResult<Json<Collector>> {
    payload.validate()?;
    Ok(Json(catalog::create_collector(&state.storage, payload)?))
}

/// PUT /api/collectors/{id}
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(payload): Json<CollectorUpdate>,
) -> AppResult<Json<Collector>> {
    payload.validate()?;
    Ok(Json(catalog::update_collector(&state.storage, id, payload)?))
}

/// DELETE /api/collectors/{id}, refused while referenced
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<bool>> {
    catalog::delete::<Collector>(&state.storage, id)?;
    Ok(Json(true))
}
