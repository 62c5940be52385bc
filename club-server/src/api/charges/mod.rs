//! Monthly charge generation

use axum::{Json, Router, extract::State, middleware, routing::post};
use shared::models::{ChargeGenerate, ChargeRunResult};

use crate::auth::permissions::CHARGES_MANAGE;
use crate::auth::{CurrentUser, require_permission};
use crate::core::ServerState;
use crate::db::repository::movement;
use crate::utils::AppResult;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/charges/generate", post(generate))
        .layer(middleware::from_fn(require_permission(CHARGES_MANAGE)))
}

/// POST /api/charges/generate {period: "YYYY-MM"}
///
/// Idempotent per (member, period, source).
async fn generate(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<ChargeGenerate>,
) -> AppResult<Json<ChargeRunResult>> {
    let result = movement::generate_charges(
        &state.storage,
        &payload.period,
        state.config.charge_due_day,
    )?;
    tracing::info!(
        period = %result.period,
        created = result.created,
        skipped = result.skipped,
        operator = %current_user.username,
        "Charge run finished"
    );
    Ok(Json(result))
}
