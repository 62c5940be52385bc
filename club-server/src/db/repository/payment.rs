//! Payment Repository
//!
//! A payment and its CREDIT movement are written in one transaction and
//! removed together.

use chrono::NaiveDate;
use shared::error::ErrorCode;
use shared::models::{Collector, Movement, Payment, PaymentCreate, PaymentDetail, PaymentQuery};

use super::movement::{NewCredit, insert_credit};
use super::{RepoError, RepoResult, catalog, member::require_member};
use crate::db::storage::{
    ClubStorage, MOVEMENTS, PAYMENTS, all_records, get_child, get_record, next_sequence,
    put_record, seq,
};

/// Payments matching `query`, newest first
pub fn find_all(storage: &ClubStorage, query: &PaymentQuery) -> RepoResult<Vec<Payment>> {
    let txn = storage.begin_read()?;
    let mut payments: Vec<Payment> = all_records(&txn.open_table(PAYMENTS)?)?;
    payments.retain(|p| {
        query.member_id.is_none_or(|id| p.member_id == id)
            && query.collector_id.is_none_or(|id| p.collector_id == Some(id))
            && query.from.is_none_or(|from| p.date >= from)
            && query.to.is_none_or(|to| p.date <= to)
    });
    payments.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    Ok(payments)
}

pub fn find_by_id(storage: &ClubStorage, id: u64) -> RepoResult<PaymentDetail> {
    let txn = storage.begin_read()?;
    let payment: Payment = get_record(&txn.open_table(PAYMENTS)?, id)?
        .ok_or_else(|| RepoError::not_found(ErrorCode::PaymentNotFound, "Payment", id))?;
    let credit: Option<Movement> =
        get_child(&txn.open_table(MOVEMENTS)?, payment.member_id, payment.movement_id)?;
    Ok(PaymentDetail {
        allocations: credit.map(|c| c.allocations).unwrap_or_default(),
        payment,
    })
}

/// Register a payment and its CREDIT
pub fn create(
    storage: &ClubStorage,
    data: PaymentCreate,
    created_by: &str,
    today: NaiveDate,
) -> RepoResult<PaymentDetail> {
    if data.amount <= 0 {
        return Err(RepoError::Validation(
            ErrorCode::PaymentInvalidAmount,
            "Payment amount must be positive".to_string(),
        ));
    }

    let txn = storage.begin_write()?;
    let member = require_member(&txn, data.member_id)?;
    if let Some(collector_id) = data.collector_id {
        catalog::require::<Collector>(&txn, collector_id)?;
    }

    let id = next_sequence(&txn, seq::PAYMENTS)?;
    let receipt_number = format!("REC-{:06}", next_sequence(&txn, seq::RECEIPT)?);
    let date = data.date.unwrap_or(today);

    let credit = insert_credit(
        &txn,
        NewCredit {
            member_id: member.id,
            amount: data.amount,
            concept: format!("Pago {}", receipt_number),
            date,
            payment_id: Some(id),
            allocations: data.allocations,
        },
    )?;

    let payment = Payment {
        id,
        receipt_number,
        member_id: member.id,
        amount: data.amount,
        date,
        method: data.method,
        collector_id: data.collector_id,
        notes: data.notes,
        movement_id: credit.id,
        created_by: created_by.to_string(),
        created_at: credit.created_at,
    };
    put_record(&mut txn.open_table(PAYMENTS)?, id, &payment)?;
    txn.commit()?;

    tracing::info!(
        payment_id = payment.id,
        receipt = %payment.receipt_number,
        member_id = payment.member_id,
        amount = payment.amount,
        allocated = credit.allocated_total(),
        created_by = %payment.created_by,
        "Payment registered"
    );
    Ok(PaymentDetail {
        payment,
        allocations: credit.allocations,
    })
}

/// Delete a payment together with its CREDIT
pub fn delete(storage: &ClubStorage, id: u64) -> RepoResult<()> {
    let txn = storage.begin_write()?;
    {
        let mut payments = txn.open_table(PAYMENTS)?;
        let payment: Payment = get_record(&payments, id)?
            .ok_or_else(|| RepoError::not_found(ErrorCode::PaymentNotFound, "Payment", id))?;
        txn.open_table(MOVEMENTS)?
            .remove((payment.member_id, payment.movement_id))?;
        payments.remove(id)?;
    }
    txn.commit()?;

    tracing::info!(payment_id = id, "Payment deleted");
    Ok(())
}
