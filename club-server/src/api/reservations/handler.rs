//! Reservation API handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::models::{
    ApaUpdate, ExpireResult, Reservation, ReservationCreate, ReservationPayment,
    ReservationPaymentCreate, ReservationPaymentResult, ReservationQuery, ReservationStatusUpdate,
};
use shared::util::now_millis;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::reservation;
use crate::utils::AppResult;

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<Vec<Reservation>>> {
    Ok(Json(reservation::find_all(&state.storage, &query)?))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Reservation>> {
    Ok(Json(reservation::find_by_id(&state.storage, id)?))
}

/// POST /api/reservations
///
/// Rejected with 409 when the venue already has a PENDING, HOLD, CONFIRMED
/// or ACTIVO reservation overlapping the period.
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ReservationCreate>,
) -> AppResult<Json<Reservation>> {
    payload.validate()?;
    Ok(Json(reservation::create(&state.storage, payload, now_millis())?))
}

/// PATCH /api/reservations/{id}/status
pub async fn update_status(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<u64>,
    Json(payload): Json<ReservationStatusUpdate>,
) -> AppResult<Json<Reservation>> {
    let updated = reservation::update_status(
        &state.storage,
        id,
        payload.status,
        &current_user.username,
        now_millis(),
    )?;
    Ok(Json(updated))
}

/// PATCH /api/reservations/{id}/apa
pub async fn update_apa(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(payload): Json<ApaUpdate>,
) -> AppResult<Json<Reservation>> {
    payload.validate()?;
    Ok(Json(reservation::update_apa(&state.storage, id, payload, now_millis())?))
}

pub async fn payments(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Vec<ReservationPayment>>> {
    Ok(Json(reservation::payments(&state.storage, id)?))
}

/// POST /api/reservations/{id}/payments
///
/// Appends the payment and confirms the reservation once `pagado` covers
/// the deposit.
pub async fn add_payment(
    State(state): State<ServerState>,
    Path(id): Path<u64>,
    Json(payload): Json<ReservationPaymentCreate>,
) -> AppResult<Json<ReservationPaymentResult>> {
    payload.validate()?;
    let result =
        reservation::add_payment(&state.storage, id, payload, state.today(), now_millis())?;
    Ok(Json(result))
}

/// POST /api/reservations/expire
pub async fn expire(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<ExpireResult>> {
    let result = reservation::expire_due(&state.storage, now_millis())?;
    tracing::info!(
        updated = result.updated,
        source = "request",
        operator = %current_user.username,
        "Reservation expiry sweep"
    );
    Ok(Json(result))
}
