//! Refinancing Repository

use chrono::NaiveDate;
use shared::error::{AppError, ErrorCode};
use shared::models::{Refinancing, RefinancingCreate, RefinancingQuery, RefinancingStatus};

use super::{RepoError, RepoResult, member::require_member};
use crate::db::storage::{
    ClubStorage, REFINANCINGS, all_records, get_record, next_sequence, put_record, seq,
};
use crate::refinancing;

fn not_found(id: u64) -> RepoError {
    RepoError::not_found(ErrorCode::RefinancingNotFound, "Refinancing", id)
}

pub fn find_all(storage: &ClubStorage, query: &RefinancingQuery) -> RepoResult<Vec<Refinancing>> {
    let txn = storage.begin_read()?;
    let mut rows: Vec<Refinancing> = all_records(&txn.open_table(REFINANCINGS)?)?;
    rows.retain(|r| {
        query.member_id.is_none_or(|id| r.member_id == id)
            && query.status.is_none_or(|s| r.status == s)
    });
    Ok(rows)
}

pub fn find_by_id(storage: &ClubStorage, id: u64) -> RepoResult<Refinancing> {
    let txn = storage.begin_read()?;
    get_record(&txn.open_table(REFINANCINGS)?, id)?.ok_or_else(|| not_found(id))
}

/// Validate the terms, build the schedule and store the plan
pub fn create(
    storage: &ClubStorage,
    data: RefinancingCreate,
    today: NaiveDate,
) -> RepoResult<Refinancing> {
    let schedule = refinancing::calculate(&data.terms, today).map_err(|errors| {
        AppError::validation_errors(ErrorCode::RefinancingInvalidTerms, errors)
    })?;

    let now = shared::util::now_millis();
    let txn = storage.begin_write()?;
    require_member(&txn, data.member_id)?;
    let id = next_sequence(&txn, seq::REFINANCINGS)?;
    let plan = Refinancing {
        id,
        member_id: data.member_id,
        principal: schedule.principal,
        down_payment_percent: data.terms.down_payment_percent,
        down_payment: schedule.down_payment,
        financed_amount: schedule.financed_amount,
        installment_count: schedule.installments.len() as u32,
        first_due_date: data.terms.first_due_date,
        installments: schedule.installments,
        status: RefinancingStatus::Activa,
        notes: data.notes,
        created_at: now,
        updated_at: now,
    };
    put_record(&mut txn.open_table(REFINANCINGS)?, id, &plan)?;
    txn.commit()?;

    tracing::info!(
        refinancing_id = id,
        member_id = plan.member_id,
        principal = plan.principal,
        installments = plan.installment_count,
        "Refinancing created"
    );
    Ok(plan)
}

pub fn pay_installment(storage: &ClubStorage, id: u64, number: u32) -> RepoResult<Refinancing> {
    change(storage, id, |plan, now| refinancing::pay_installment(plan, number, now))
}

pub fn cancel(storage: &ClubStorage, id: u64) -> RepoResult<Refinancing> {
    change(storage, id, refinancing::cancel)
}

fn change(
    storage: &ClubStorage,
    id: u64,
    apply: impl FnOnce(&mut Refinancing, i64) -> shared::error::AppResult<()>,
) -> RepoResult<Refinancing> {
    let txn = storage.begin_write()?;
    let plan = {
        let mut table = txn.open_table(REFINANCINGS)?;
        let mut plan: Refinancing = get_record(&table, id)?.ok_or_else(|| not_found(id))?;
        apply(&mut plan, shared::util::now_millis())?;
        put_record(&mut table, id, &plan)?;
        plan
    };
    txn.commit()?;

    tracing::info!(refinancing_id = id, status = ?plan.status, "Refinancing updated");
    Ok(plan)
}
