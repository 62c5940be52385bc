//! Authentication handlers

use std::time::Duration;

use axum::{Json, extract::State, http::header, response::IntoResponse};
use serde::Serialize;
use shared::error::ErrorCode;
use shared::models::{LoginRequest, LoginResponse, User};

use crate::auth::{AUTH_COOKIE, CurrentUser, password};
use crate::core::ServerState;
use crate::db::repository::user;
use crate::security_log;
use crate::utils::{AppError, AppResult};

/// Fixed delay before answering a login, hides whether the user exists
const AUTH_FIXED_DELAY_MS: u64 = 500;

fn session_cookie(state: &ServerState, token: &str) -> String {
    let secure = if state.config.is_production() { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}{}",
        AUTH_COOKIE,
        token,
        state.get_jwt_service().max_age_seconds(),
        secure
    )
}

/// POST /api/auth/login
///
/// Returns the token in the body and as the `club_token` cookie.
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let record = user::find_by_username(&state.storage, &req.username)?;

    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    // Same error for unknown user and wrong password
    let record = match record {
        Some(record) if password::verify_password(&req.password, &record.password_hash) => record,
        Some(_) | None => {
            security_log!("WARN", "login_failed", username = req.username.clone());
            return Err(AppError::invalid_credentials());
        }
    };

    if !record.user.active {
        security_log!("WARN", "login_disabled", username = record.user.username.clone());
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    let u = record.user;
    let token = state
        .get_jwt_service()
        .generate_token(u.id, &u.username, &u.display_name, u.role)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

    tracing::info!(
        user_id = u.id,
        username = %u.username,
        role = %u.role,
        "User logged in"
    );

    let cookie = session_cookie(&state, &token);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse { token, user: u }),
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    user: User,
    permissions: Vec<String>,
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<ServerState>,
    current: CurrentUser,
) -> AppResult<Json<MeResponse>> {
    let user = user::find_by_id(&state.storage, current.id)?;
    Ok(Json(MeResponse {
        user,
        permissions: current.permissions,
    }))
}

/// POST /api/auth/logout, clears the session cookie
pub async fn logout(current: CurrentUser) -> impl IntoResponse {
    tracing::info!(user_id = current.id, username = %current.username, "User logged out");
    (
        [(
            header::SET_COOKIE,
            format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", AUTH_COOKIE),
        )],
        Json(serde_json::json!({ "ok": true })),
    )
}
