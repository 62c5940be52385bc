//! Movement Repository
//!
//! Manual DEBIT/CREDIT entries and monthly charge runs. Allocations are
//! validated against the member's stored movements inside the same write
//! transaction that inserts the CREDIT.

use std::collections::HashMap;

use chrono::NaiveDate;
use redb::WriteTransaction;
use shared::error::ErrorCode;
use shared::models::{
    Allocation, Category, ChargeRunResult, Member, Movement, MovementCreate, MovementKind, Service,
};

use super::member::require_member;
use super::{RepoError, RepoResult};
use crate::db::storage::{
    CATEGORIES, ClubStorage, MEMBERS, MOVEMENTS, SERVICES, all_children, all_records, children,
    get_child, next_sequence, put_child, seq,
};
use crate::ledger;
use crate::utils::time;

/// CREDIT to be inserted for a member
pub(crate) struct NewCredit {
    pub member_id: u64,
    pub amount: i64,
    pub concept: String,
    pub date: NaiveDate,
    pub payment_id: Option<u64>,
    /// `None` allocates FIFO
    pub allocations: Option<Vec<Allocation>>,
}

/// Insert a CREDIT after validating its allocations
pub(crate) fn insert_credit(txn: &WriteTransaction, credit: NewCredit) -> RepoResult<Movement> {
    let mut table = txn.open_table(MOVEMENTS)?;
    let existing: Vec<Movement> = children(&table, credit.member_id)?;

    let allocations = match credit.allocations {
        Some(allocations) => {
            ledger::validate_allocations(&existing, credit.amount, &allocations)
                .map_err(|e| RepoError::Rule(e.into()))?;
            allocations
        }
        None => ledger::auto_allocate(&existing, credit.amount),
    };

    let id = next_sequence(txn, seq::MOVEMENTS)?;
    let movement = Movement {
        id,
        member_id: credit.member_id,
        kind: MovementKind::Credit,
        amount: credit.amount,
        concept: credit.concept,
        date: credit.date,
        due_date: None,
        period: None,
        source: None,
        payment_id: credit.payment_id,
        allocations,
        created_at: shared::util::now_millis(),
    };
    put_child(&mut table, movement.member_id, id, &movement)?;
    Ok(movement)
}

/// Record a manual movement for a member
pub fn create(
    storage: &ClubStorage,
    member_id: u64,
    data: MovementCreate,
    today: NaiveDate,
) -> RepoResult<Movement> {
    let txn = storage.begin_write()?;
    require_member(&txn, member_id)?;
    let date = data.date.unwrap_or(today);

    let movement = match data.kind {
        MovementKind::Credit => insert_credit(
            &txn,
            NewCredit {
                member_id,
                amount: data.amount,
                concept: data.concept,
                date,
                payment_id: None,
                allocations: data.allocations,
            },
        )?,
        MovementKind::Debit => {
            if data.allocations.as_ref().is_some_and(|a| !a.is_empty()) {
                return Err(RepoError::Validation(
                    ErrorCode::AllocationInvalid,
                    "Only credits carry allocations".to_string(),
                ));
            }
            if let Some(period) = &data.period {
                time::parse_period(period)?;
            }
            let id = next_sequence(&txn, seq::MOVEMENTS)?;
            let movement = Movement {
                id,
                member_id,
                kind: MovementKind::Debit,
                amount: data.amount,
                concept: data.concept,
                date,
                due_date: Some(data.due_date.unwrap_or(date)),
                period: data.period,
                source: None,
                payment_id: None,
                allocations: Vec::new(),
                created_at: shared::util::now_millis(),
            };
            put_child(&mut txn.open_table(MOVEMENTS)?, member_id, id, &movement)?;
            movement
        }
    };
    txn.commit()?;

    tracing::info!(
        member_id,
        movement_id = movement.id,
        tipo = ?movement.kind,
        amount = movement.amount,
        "Movement recorded"
    );
    Ok(movement)
}

/// Delete a movement.
///
/// A DEBIT referenced by any allocation stays; a CREDIT that belongs to a
/// payment is removed only through the payment.
pub fn delete(storage: &ClubStorage, member_id: u64, movement_id: u64) -> RepoResult<()> {
    let txn = storage.begin_write()?;
    {
        require_member(&txn, member_id)?;
        let mut table = txn.open_table(MOVEMENTS)?;
        let movement: Movement = get_child(&table, member_id, movement_id)?.ok_or_else(|| {
            RepoError::not_found(ErrorCode::MovementNotFound, "Movement", movement_id)
        })?;

        if let Some(payment_id) = movement.payment_id {
            return Err(RepoError::InvalidState(
                ErrorCode::MovementLinkedToPayment,
                format!("Movement {} belongs to payment {}", movement_id, payment_id),
            ));
        }
        if movement.is_debit() {
            let ledger: Vec<Movement> = children(&table, member_id)?;
            let referenced = ledger
                .iter()
                .filter(|m| m.is_credit())
                .any(|c| c.allocations.iter().any(|a| a.debit_id == movement_id));
            if referenced {
                return Err(RepoError::InvalidState(
                    ErrorCode::MovementReferenced,
                    format!("Debit {} has payments allocated to it", movement_id),
                ));
            }
        }
        table.remove((member_id, movement_id))?;
    }
    txn.commit()?;

    tracing::info!(member_id, movement_id, "Movement deleted");
    Ok(())
}

/// Generate the monthly charges for `period` (`YYYY-MM`).
///
/// Running the same period twice creates nothing new.
pub fn generate_charges(
    storage: &ClubStorage,
    period: &str,
    due_day: u32,
) -> RepoResult<ChargeRunResult> {
    let (year, month) = time::parse_period(period)?;
    let date = time::clamped_date(year, month, 1).ok_or_else(|| {
        RepoError::Validation(ErrorCode::ChargePeriodInvalid, format!("Invalid period {}", period))
    })?;
    let due_date = ledger::charge_due_date(year, month, due_day).unwrap_or(date);

    let txn = storage.begin_write()?;
    let result = {
        let members: Vec<Member> = all_records(&txn.open_table(MEMBERS)?)?;
        let categories: HashMap<u64, Category> = all_records::<Category>(&txn.open_table(CATEGORIES)?)?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let services: HashMap<u64, Service> = all_records::<Service>(&txn.open_table(SERVICES)?)?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let mut table = txn.open_table(MOVEMENTS)?;
        let existing: Vec<Movement> = all_children(&table)?;
        let plan = ledger::plan_charges(period, &members, &categories, &services, &existing);

        let now = shared::util::now_millis();
        for charge in &plan.charges {
            let id = next_sequence(&txn, seq::MOVEMENTS)?;
            let movement = Movement {
                id,
                member_id: charge.member_id,
                kind: MovementKind::Debit,
                amount: charge.amount,
                concept: charge.concept.clone(),
                date,
                due_date: Some(due_date),
                period: Some(period.to_string()),
                source: Some(charge.source.clone()),
                payment_id: None,
                allocations: Vec::new(),
                created_at: now,
            };
            put_child(&mut table, charge.member_id, id, &movement)?;
        }

        ChargeRunResult {
            period: period.to_string(),
            members: members.iter().filter(|m| m.active).count(),
            created: plan.charges.len(),
            skipped: plan.skipped,
        }
    };
    txn.commit()?;

    tracing::info!(
        period = %result.period,
        created = result.created,
        skipped = result.skipped,
        "Monthly charges generated"
    );
    Ok(result)
}
