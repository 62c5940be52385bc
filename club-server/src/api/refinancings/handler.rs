//! Refinancing API handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::error::ErrorCode;
use shared::models::{
    Refinancing, RefinancingCreate, RefinancingQuery, RefinancingSchedule, RefinancingTerms,
};

use crate::core::ServerState;
use crate::db::repository::refinancing as repo;
use crate::refinancing;
use crate::utils::{AppError, AppResult};

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<RefinancingQuery>,
) -> AppResult<Json<Vec<Refinancing>>> {
    Ok(Json(repo::find_all(&state.storage, &query)?))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Refinancing>> {
    Ok(Json(repo::find_by_id(&state.storage, id)?))
}

/// POST /api/refinancings/simulate
///
/// Computes the schedule without storing anything. Invalid terms answer
/// 400 with every failed rule in `details.errors`.
pub async fn simulate(
    State(state): State<ServerState>,
    Json(terms): Json<RefinancingTerms>,
) -> AppResult<Json<RefinancingSchedule>> {
    let schedule = refinancing::calculate(&terms, state.today())
        .map_err(|errors| AppError::validation_errors(ErrorCode::RefinancingInvalidTerms, errors))?;
    Ok(Json(schedule))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<RefinancingCreate>,
) -> AppResult<Json<Refinancing>> {
    Ok(Json(repo::create(&state.storage, payload, state.today())?))
}

/// POST /api/refinancings/{id}/installments/{number}/pay
pub async fn pay_installment(
    State(state): State<ServerState>,
    Path((id, number)): Path<(u64, u32)>,
) -> AppResult<Json<Refinancing>> {
    Ok(Json(repo::pay_installment(&state.storage, id, number)?))
}

pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Refinancing>> {
    Ok(Json(repo::cancel(&state.storage, id)?))
}
