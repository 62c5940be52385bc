//! Payment API handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::models::{Payment, PaymentCreate, PaymentDetail, PaymentQuery};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::payment;
use crate::utils::AppResult;

/// GET /api/payments?memberId=&collectorId=&from=&to=
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<PaymentQuery>,
) -> AppResult<Json<Vec<Payment>>> {
    Ok(Json(payment::find_all(&state.storage, &query)?))
}

/// GET /api/payments/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<PaymentDetail>> {
    Ok(Json(payment::find_by_id(&state.storage, id)?))
}

/// POST /api/payments
///
/// Writes the payment and its CREDIT in one transaction. Without explicit
/// allocations the credit pays the oldest debts first.
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<PaymentCreate>,
) -> AppResult<Json<PaymentDetail>> {
    payload.validate()?;
    let detail = payment::create(&state.storage, payload, &current_user.username, state.today())?;
    Ok(Json(detail))
}

/// DELETE /api/payments/{id}, removes the payment and its CREDIT
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<bool>> {
    payment::delete(&state.storage, id)?;
    Ok(Json(true))
}
