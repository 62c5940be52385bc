//! Cron routes
//!
//! Called by an external scheduler with `Authorization: Bearer
//! <CRON_SECRET>`. They bypass the session check and are guarded by
//! [`require_cron_secret`] instead.

use axum::{Json, Router, extract::State, middleware, routing::get};
use shared::models::ExpireResult;
use shared::util::now_millis;

use crate::auth::require_cron_secret;
use crate::core::ServerState;
use crate::db::repository::reservation;
use crate::utils::AppResult;

pub fn router(state: &ServerState) -> Router<ServerState> {
    Router::new()
        .route("/api/cron/reservations/expire", get(expire).post(expire))
        .layer(middleware::from_fn_with_state(state.clone(), require_cron_secret))
}

/// GET|POST /api/cron/reservations/expire
async fn expire(State(state): State<ServerState>) -> AppResult<Json<ExpireResult>> {
    let result = reservation::expire_due(&state.storage, now_millis())?;
    tracing::info!(updated = result.updated, ids = ?result.ids, source = "cron", "Reservation expiry sweep");
    Ok(Json(result))
}
