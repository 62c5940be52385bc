//! Reservation payment ingestion

use shared::models::{Reservation, ReservationPayment, ReservationStatus};

/// Recompute `pagado` from every payment of the reservation and promote a
/// PENDING or HOLD reservation once the deposit is covered.
///
/// Returns whether the reservation was promoted to CONFIRMED.
pub fn apply_payments(reservation: &mut Reservation, payments: &[ReservationPayment], now: i64) -> bool {
    let total = payments
        .iter()
        .fold(0i64, |sum, p| sum.saturating_add(p.amount));
    // Append-only rows, so the sum only grows
    reservation.pagado = total.max(reservation.pagado);
    reservation.updated_at = now;

    let awaiting_deposit = matches!(
        reservation.status,
        ReservationStatus::Pending | ReservationStatus::Hold
    );
    if awaiting_deposit && reservation.pagado >= reservation.deposito_requerido {
        reservation.status = ReservationStatus::Confirmed;
        return true;
    }
    false
}
