//! Member API handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::models::{
    Member, MemberBalance, MemberCreate, MemberQuery, MemberUpdate, MemberView, Movement,
    MovementCreate,
};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{member, movement};
use crate::utils::AppResult;

/// GET /api/members?status=ATRASADO&q=...
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<MemberQuery>,
) -> AppResult<Json<Vec<MemberView>>> {
    let members = member::find_all(&state.storage, &query, state.today())?;
    Ok(Json(members))
}

/// GET /api/members/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<MemberView>> {
    Ok(Json(member::find_by_id(&state.storage, id, state.today())?))
}

/// POST /api/members
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<MemberCreate>,
) -> AppResult<Json<Member>> {
    payload.validate()?;
    Ok(Json(member::create(&state.storage, payload, state.today())?))
}

/// PUT /api/members/{id}
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(payload): Json<MemberUpdate>,
) -> AppResult<Json<Member>> {
    payload.validate()?;
    Ok(Json(member::update(&state.storage, id, payload)?))
}

/// DELETE /api/members/{id}
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<bool>> {
    member::delete(&state.storage, id)?;
    Ok(Json(true))
}

/// GET /api/members/{id}/movements
pub async fn movements(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Vec<Movement>>> {
    Ok(Json(member::movements(&state.storage, id)?))
}

/// GET /api/members/{id}/balance
pub async fn balance(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<MemberBalance>> {
    Ok(Json(member::balance(&state.storage, id, state.today())?))
}

/// POST /api/members/{id}/movements, manual DEBIT or CREDIT
pub async fn create_movement(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<u64>,
    Json(payload): Json<MovementCreate>,
) -> AppResult<Json<Movement>> {
    payload.validate()?;
    let movement = movement::create(&state.storage, id, payload, state.today())?;
    tracing::info!(
        member_id = id,
        movement_id = movement.id,
        kind = ?movement.kind,
        amount = movement.amount,
        operator = %current_user.username,
        "Manual movement recorded"
    );
    Ok(Json(movement))
}

/// DELETE /api/members/{id}/movements/{movement_id}
pub async fn delete_movement(
    State(state): State<ServerState>,
    Path((id, movement_id)): Path<(u64, u64)>,
) -> AppResult<Json<bool>> {
    movement::delete(&state.storage, id, movement_id)?;
    Ok(Json(true))
}
