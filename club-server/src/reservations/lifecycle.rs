//! Reservation status machine
//!
//! ```text
//! PENDING <-> HOLD
//! PENDING | HOLD -> CONFIRMED -> ACTIVO -> CULMINADO
//! any non-terminal -> CANCELADO
//! ```
//!
//! ACTIVO -> CULMINADO is only allowed once `end` has passed.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Reservation, ReservationStatus};

use ReservationStatus::*;

/// Status a new reservation starts in
pub fn initial_status(deposito_requerido: i64, hold: bool) -> ReservationStatus {
    if deposito_requerido <= 0 {
        Confirmed
    } else if hold {
        Hold
    } else {
        Pending
    }
}

/// Venue deposit: `monto_total * percent / 100`, half away from zero
pub fn default_deposit(monto_total: i64, deposit_percent: u8) -> i64 {
    (Decimal::from(monto_total) * Decimal::from(deposit_percent) / Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(monto_total)
}

pub fn can_transition(from: ReservationStatus, to: ReservationStatus) -> bool {
    matches!(
        (from, to),
        (Pending, Hold)
            | (Hold, Pending)
            | (Pending | Hold, Confirmed)
            | (Confirmed, Activo)
            | (Activo, Culminado)
            | (Pending | Hold | Confirmed | Activo, Cancelado)
    )
}

/// Move to `to`. Returns `false` when already there.
pub fn transition(reservation: &mut Reservation, to: ReservationStatus, now: i64) -> AppResult<bool> {
    if reservation.status == to {
        return Ok(false);
    }
    if !can_transition(reservation.status, to) {
        return Err(AppError::with_message(
            ErrorCode::ReservationInvalidTransition,
            format!("Cannot move reservation from {} to {}", reservation.status, to),
        )
        .with_detail("from", reservation.status.as_str())
        .with_detail("to", to.as_str()));
    }
    if to == Culminado && reservation.end > now {
        return Err(AppError::with_message(
            ErrorCode::ReservationInvalidTransition,
            "Reservation has not ended yet",
        )
        .with_detail("end", reservation.end));
    }
    reservation.status = to;
    reservation.updated_at = now;
    Ok(true)
}

/// First venue-blocking reservation of `resource_id` overlapping `[start, end)`
pub fn find_conflict(
    reservations: &[Reservation],
    resource_id: u64,
    start: i64,
    end: i64,
) -> Option<&Reservation> {
    reservations.iter().find(|r| {
        r.resource_id == resource_id && r.status.blocks_venue() && r.overlaps(start, end)
    })
}
