//! Store maintenance (ADMIN role only)
//!
//! | Path | Method | Meaning |
//! |------|--------|---------|
//! | /api/maintenance/integrity | GET | report problems, change nothing |
//! | /api/maintenance/repair | POST | fix every reported problem |
//! | /api/maintenance/export | GET | whole store as one JSON document |
//! | /api/maintenance/import | POST | load such a document into an empty store |

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    middleware,
    routing::{get, post},
};
use shared::util::now_millis;

use crate::auth::{CurrentUser, require_admin};
use crate::core::ServerState;
use crate::db::integrity::{self, IntegrityReport, RepairResult};
use crate::db::snapshot::{self, ImportResult, StoreSnapshot};
use crate::security_log;
use crate::utils::AppResult;

/// Legacy store files run to a few megabytes
const IMPORT_BODY_LIMIT: usize = 64 * 1024 * 1024;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/maintenance/integrity", get(check))
        .route("/api/maintenance/repair", post(repair))
        .route("/api/maintenance/export", get(export))
        .route(
            "/api/maintenance/import",
            post(import).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        )
        .layer(middleware::from_fn(require_admin))
}

async fn check(State(state): State<ServerState>) -> AppResult<Json<IntegrityReport>> {
    Ok(Json(integrity::inspect(&state.storage)?))
}

async fn repair(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<RepairResult>> {
    let result = integrity::repair(&state.storage, now_millis())?;
    security_log!("INFO", "store_repaired", operator = current_user.username.clone());
    Ok(Json(result))
}

async fn export(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<StoreSnapshot>> {
    let snapshot = snapshot::export(&state.storage)?;
    security_log!("INFO", "store_exported", operator = current_user.username.clone());
    Ok(Json(snapshot))
}

async fn import(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<StoreSnapshot>,
) -> AppResult<Json<ImportResult>> {
    let result = snapshot::import(&state.storage, payload)?;
    security_log!("INFO", "store_imported", operator = current_user.username.clone());
    Ok(Json(result))
}
