//! Category API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{Category, CategoryCreate, CategoryUpdate};
use validator::Validate;

use crate::core::ServerState;
use crate::db::repository::catalog;
use crate::utils::AppResult;

/// GET /api/categories
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(catalog::find_all::<Category>(&state.storage)?))
}

/// GET /api/categories/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Category>> {
    Ok(Json(catalog::find_by_id::<Category>(&state.storage, id)?))
}

/// POST /api/categories
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CategoryCreate>,
) -> AppResult<Json<Category>> {
    payload.validate()?;
    Ok(Json(catalog::create_category(&state.storage, payload)?))
}

/// PUT /api/categories/{id}
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(payload): Json<CategoryUpdate>,
) -> AppResult<Json<Category>> {
    payload.validate()?;
    Ok(Json(catalog::update_category(&state.storage, id, payload)?))
}

/// DELETE /api/categories/{id}, refused while referenced
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<bool>> {
    catalog::delete::<Category>(&state.storage, id)?;
    Ok(Json(true))
}
