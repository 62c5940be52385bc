//! Reservation Repository
//!
//! Overlap checks, status changes, payment ingestion and the expiry sweep
//! each run inside one write transaction, so two requests can never book
//! the same slot or double-count a sweep.

use chrono::NaiveDate;
use shared::error::ErrorCode;
use shared::models::{
    ApaStatus, ApaUpdate, ExpireResult, Reservation, ReservationCreate, ReservationPayment,
    ReservationPaymentCreate, ReservationPaymentResult, ReservationQuery, ReservationStatus,
    Resource,
};

use super::{RepoError, RepoResult, catalog, member::require_member};
use crate::db::storage::{
    ClubStorage, RESERVATION_PAYMENTS, RESERVATIONS, all_records, children, get_record,
    next_sequence, put_child, put_record, seq,
};
use crate::reservations;

fn not_found(id: u64) -> RepoError {
    RepoError::not_found(ErrorCode::ReservationNotFound, "Reservation", id)
}

/// Reservations matching `query`, ordered by start
pub fn find_all(storage: &ClubStorage, query: &ReservationQuery) -> RepoResult<Vec<Reservation>> {
    let txn = storage.begin_read()?;
    let mut rows: Vec<Reservation> = all_records(&txn.open_table(RESERVATIONS)?)?;
    rows.retain(|r| {
        query.status.is_none_or(|s| r.status == s)
            && query.resource_id.is_none_or(|id| r.resource_id == id)
            && query.member_id.is_none_or(|id| r.member_id == id)
    });
    rows.sort_by_key(|r| (r.start, r.id));
    Ok(rows)
}

pub fn find_by_id(storage: &ClubStorage, id: u64) -> RepoResult<Reservation> {
    let txn = storage.begin_read()?;
    get_record(&txn.open_table(RESERVATIONS)?, id)?.ok_or_else(|| not_found(id))
}

/// Book a venue.
///
/// Fails on an empty or inverted period, an unknown or inactive venue, an
/// unknown member, or an overlap with a live booking of the same venue.
pub fn create(storage: &ClubStorage, data: ReservationCreate, now: i64) -> RepoResult<Reservation> {
    if data.end <= data.start {
        return Err(RepoError::Validation(
            ErrorCode::ReservationInvalidPeriod,
            "Reservation end must be after its start".to_string(),
        ));
    }

    let txn = storage.begin_write()?;
    let reservation = {
        let resource: Resource = catalog::require(&txn, data.resource_id)?;
        if !resource.active {
            return Err(RepoError::InvalidState(
                ErrorCode::ResourceInactive,
                format!("Venue {} is not available for booking", resource.name),
            ));
        }
        require_member(&txn, data.member_id)?;

        let mut table = txn.open_table(RESERVATIONS)?;
        let existing: Vec<Reservation> = all_records(&table)?;
        if let Some(conflict) =
            reservations::find_conflict(&existing, data.resource_id, data.start, data.end)
        {
            return Err(RepoError::Duplicate(
                ErrorCode::ReservationOverlap,
                format!(
                    "Venue {} is already booked by reservation {} ({})",
                    resource.name, conflict.id, conflict.status
                ),
            ));
        }

        let deposito_requerido = data
            .deposito_requerido
            .unwrap_or_else(|| reservations::default_deposit(data.monto_total, resource.deposit_percent));
        let id = next_sequence(&txn, seq::RESERVATIONS)?;
        let reservation = Reservation {
            id,
            resource_id: data.resource_id,
            member_id: data.member_id,
            start: data.start,
            end: data.end,
            status: reservations::initial_status(deposito_requerido, data.hold),
            monto_total: data.monto_total,
            pagado: 0,
            deposito_requerido,
            apa_estado: None,
            apa_comprobante: None,
            apa_fecha_revision: None,
            notes: data.notes,
            created_at: now,
            updated_at: now,
        };
        put_record(&mut table, id, &reservation)?;
        reservation
    };
    txn.commit()?;

    tracing::info!(
        reservation_id = reservation.id,
        resource_id = reservation.resource_id,
        status = %reservation.status,
        "Reservation created"
    );
    Ok(reservation)
}

/// Explicit status change by `operator`
pub fn update_status(
    storage: &ClubStorage,
    id: u64,
    status: ReservationStatus,
    operator: &str,
    now: i64,
) -> RepoResult<Reservation> {
    let txn = storage.begin_write()?;
    let (reservation, from) = {
        let mut table = txn.open_table(RESERVATIONS)?;
        let mut reservation: Reservation = get_record(&table, id)?.ok_or_else(|| not_found(id))?;
        let from = reservation.status;
        if reservations::transition(&mut reservation, status, now)? {
            put_record(&mut table, id, &reservation)?;
        }
        (reservation, from)
    };
    txn.commit()?;

    if from != reservation.status {
        tracing::info!(
            reservation_id = id,
            from = %from,
            to = %reservation.status,
            operator = %operator,
            "Reservation status changed"
        );
    }
    Ok(reservation)
}

/// Record an APA review. Allowed in any status.
pub fn update_apa(
    storage: &ClubStorage,
    id: u64,
    data: ApaUpdate,
    now: i64,
) -> RepoResult<Reservation> {
    let txn = storage.begin_write()?;
    let reservation = {
        let mut table = txn.open_table(RESERVATIONS)?;
        let mut reservation: Reservation = get_record(&table, id)?.ok_or_else(|| not_found(id))?;
        reservation.apa_estado = Some(data.apa_estado);
        if data.apa_comprobante.is_some() {
            reservation.apa_comprobante = data.apa_comprobante;
        }
        reservation.apa_fecha_revision = match data.apa_estado {
            ApaStatus::Aprobado | ApaStatus::Rechazado => Some(now),
            ApaStatus::Pendiente => None,
        };
        reservation.updated_at = now;
        put_record(&mut table, id, &reservation)?;
        reservation
    };
    txn.commit()?;
    Ok(reservation)
}

pub fn payments(storage: &ClubStorage, id: u64) -> RepoResult<Vec<ReservationPayment>> {
    let txn = storage.begin_read()?;
    if get_record::<Reservation>(&txn.open_table(RESERVATIONS)?, id)?.is_none() {
        return Err(not_found(id));
    }
    Ok(children(&txn.open_table(RESERVATION_PAYMENTS)?, id)?)
}

/// Append a payment, recompute `pagado` and confirm once the deposit is met
pub fn add_payment(
    storage: &ClubStorage,
    id: u64,
    data: ReservationPaymentCreate,
    today: NaiveDate,
    now: i64,
) -> RepoResult<ReservationPaymentResult> {
    if data.amount <= 0 {
        return Err(RepoError::Validation(
            ErrorCode::PaymentInvalidAmount,
            "Payment amount must be positive".to_string(),
        ));
    }

    let txn = storage.begin_write()?;
    let (payment, reservation, promoted) = {
        let mut table = txn.open_table(RESERVATIONS)?;
        let mut reservation: Reservation = get_record(&table, id)?.ok_or_else(|| not_found(id))?;

        let mut rows = txn.open_table(RESERVATION_PAYMENTS)?;
        let payment_id = next_sequence(&txn, seq::RESERVATION_PAYMENTS)?;
        let receipt = format!("RP-{:06}", next_sequence(&txn, seq::RESERVATION_RECEIPT)?);
        let payment = ReservationPayment {
            id: payment_id,
            reservation_id: id,
            receipt,
            amount: data.amount,
            method: data.method,
            date: data.date.unwrap_or(today),
            notes: data.notes,
            created_at: now,
        };
        put_child(&mut rows, id, payment_id, &payment)?;

        let all: Vec<ReservationPayment> = children(&rows, id)?;
        let promoted = reservations::apply_payments(&mut reservation, &all, now);
        put_record(&mut table, id, &reservation)?;
        (payment, reservation, promoted)
    };
    txn.commit()?;

    tracing::info!(
        reservation_id = id,
        receipt = %payment.receipt,
        amount = payment.amount,
        pagado = reservation.pagado,
        "Reservation payment registered"
    );
    if promoted {
        tracing::info!(reservation_id = id, "Reservation confirmed by deposit");
    }
    Ok(ReservationPaymentResult {
        payment,
        reservation,
    })
}

/// Close every ACTIVO reservation whose end has passed
pub fn expire_due(storage: &ClubStorage, now: i64) -> RepoResult<ExpireResult> {
    let txn = storage.begin_write()?;
    let ids = {
        let mut table = txn.open_table(RESERVATIONS)?;
        let rows: Vec<Reservation> = all_records(&table)?;
        let mut ids = Vec::new();
        for mut reservation in rows {
            if reservations::expire(&mut reservation, now) {
                put_record(&mut table, reservation.id, &reservation)?;
                ids.push(reservation.id);
            }
        }
        ids
    };
    txn.commit()?;

    Ok(ExpireResult {
        updated: ids.len(),
        ids,
    })
}
