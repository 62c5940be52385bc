//! User API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{PasswordReset, User, UserCreate, UserUpdate};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::user;
use crate::security_log;
use crate::utils::AppResult;

pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(user::find_all(&state.storage)?))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<UserCreate>,
) -> AppResult<Json<User>> {
    payload.validate()?;
    Ok(Json(user::create(&state.storage, payload)?))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(payload): Json<UserUpdate>,
) -> AppResult<Json<User>> {
    payload.validate()?;
    Ok(Json(user::update(&state.storage, id, payload)?))
}

/// DELETE /api/users/{id}. Deleting your own account is refused.
pub async fn delete(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<u64>,
) -> AppResult<Json<bool>> {
    user::delete(&state.storage, id, current_user.id)?;
    Ok(Json(true))
}

/// POST /api/users/{id}/password
pub async fn reset_password(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<u64>,
    Json(payload): Json<PasswordReset>,
) -> AppResult<Json<User>> {
    payload.validate()?;
    let user = user::reset_password(&state.storage, id, &payload.password)?;
    security_log!(
        "INFO",
        "password_reset",
        user_id = id,
        operator = current_user.username.clone()
    );
    Ok(Json(user))
}
