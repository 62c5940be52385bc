//! Member Repository

use std::collections::HashMap;

use chrono::NaiveDate;
use redb::{ReadableTable, Table, WriteTransaction};
use shared::error::ErrorCode;
use shared::models::{
    Category, Member, MemberBalance, MemberCreate, MemberQuery, MemberUpdate, MemberView,
    Movement, Reservation, Service,
};

use super::{RepoError, RepoResult};
use crate::db::storage::{
    CATEGORIES, ClubStorage, MEMBER_CODES, MEMBERS, MOVEMENTS, REFINANCINGS, RESERVATIONS,
    SERVICES, all_children, all_records, children, get_record, next_sequence, put_record, seq,
};
use crate::ledger;

/// Members with derived status and balance, filtered by `query`
pub fn find_all(
    storage: &ClubStorage,
    query: &MemberQuery,
    today: NaiveDate,
) -> RepoResult<Vec<MemberView>> {
    let txn = storage.begin_read()?;
    let members: Vec<Member> = all_records(&txn.open_table(MEMBERS)?)?;
    let movements: Vec<Movement> = all_children(&txn.open_table(MOVEMENTS)?)?;

    let mut by_member: HashMap<u64, Vec<Movement>> = HashMap::new();
    for movement in movements {
        by_member.entry(movement.member_id).or_default().push(movement);
    }

    let needle = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let views = members
        .into_iter()
        .filter(|m| query.active.is_none_or(|active| m.active == active))
        .filter(|m| needle.as_deref().is_none_or(|q| matches_text(m, q)))
        .map(|member| {
            let ledger = by_member.get(&member.id).map(Vec::as_slice).unwrap_or(&[]);
            view(member, ledger, today)
        })
        .filter(|v| query.status.is_none_or(|status| v.status == status))
        .collect();
    Ok(views)
}

pub fn find_by_id(storage: &ClubStorage, id: u64, today: NaiveDate) -> RepoResult<MemberView> {
    let txn = storage.begin_read()?;
    let member: Member = get_record(&txn.open_table(MEMBERS)?, id)?
        .ok_or_else(|| RepoError::not_found(ErrorCode::MemberNotFound, "Member", id))?;
    let movements: Vec<Movement> = children(&txn.open_table(MOVEMENTS)?, id)?;
    Ok(view(member, &movements, today))
}

/// Movements of one member in id order
pub fn movements(storage: &ClubStorage, id: u64) -> RepoResult<Vec<Movement>> {
    let txn = storage.begin_read()?;
    if get_record::<Member>(&txn.open_table(MEMBERS)?, id)?.is_none() {
        return Err(RepoError::not_found(ErrorCode::MemberNotFound, "Member", id));
    }
    Ok(children(&txn.open_table(MOVEMENTS)?, id)?)
}

pub fn balance(storage: &ClubStorage, id: u64, today: NaiveDate) -> RepoResult<MemberBalance> {
    let movements = movements(storage, id)?;
    Ok(ledger::compute_balance(&movements, today))
}

pub fn create(storage: &ClubStorage, data: MemberCreate, today: NaiveDate) -> RepoResult<Member> {
    let now = shared::util::now_millis();
    let txn = storage.begin_write()?;
    let member = {
        check_catalog_refs(&txn, data.category_id, &data.service_ids)?;

        let mut codes = txn.open_table(MEMBER_CODES)?;
        let code = match data.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                if codes.get(code)?.is_some() {
                    return Err(RepoError::Duplicate(
                        ErrorCode::MemberCodeExists,
                        format!("Member code {} is already in use", code),
                    ));
                }
                code.to_string()
            }
            _ => mint_member_code(&txn, &codes)?,
        };

        let id = next_sequence(&txn, seq::MEMBERS)?;
        let member = Member {
            id,
            code,
            first_name: data.first_name.trim().to_string(),
            last_name: data.last_name.trim().to_string(),
            document: data.document.trim().to_string(),
            email: data.email,
            phone: data.phone,
            address: data.address,
            category_id: data.category_id,
            service_ids: dedup(data.service_ids),
            joined_on: data.joined_on.unwrap_or(today),
            active: true,
            notes: data.notes,
            created_at: now,
            updated_at: now,
        };
        codes.insert(member.code.as_str(), id)?;
        put_record(&mut txn.open_table(MEMBERS)?, id, &member)?;
        member
    };
    txn.commit()?;

    tracing::info!(member_id = member.id, code = %member.code, "Member created");
    Ok(member)
}

pub fn update(storage: &ClubStorage, id: u64, data: MemberUpdate) -> RepoResult<Member> {
    let txn = storage.begin_write()?;
    let member = {
        let mut members = txn.open_table(MEMBERS)?;
        let mut member: Member = get_record(&members, id)?
            .ok_or_else(|| RepoError::not_found(ErrorCode::MemberNotFound, "Member", id))?;

        let service_ids = data.service_ids.map(dedup);
        check_catalog_refs(
            &txn,
            data.category_id,
            service_ids.as_deref().unwrap_or(&[]),
        )?;

        if let Some(v) = data.first_name {
            member.first_name = v.trim().to_string();
        }
        if let Some(v) = data.last_name {
            member.last_name = v.trim().to_string();
        }
        if let Some(v) = data.document {
            member.document = v.trim().to_string();
        }
        if let Some(v) = data.email {
            member.email = Some(v);
        }
        if let Some(v) = data.phone {
            member.phone = Some(v);
        }
        if let Some(v) = data.address {
            member.address = Some(v);
        }
        if let Some(v) = data.category_id {
            member.category_id = Some(v);
        }
        if let Some(v) = service_ids {
            member.service_ids = v;
        }
        if let Some(v) = data.joined_on {
            member.joined_on = v;
        }
        if let Some(v) = data.active {
            member.active = v;
        }
        if let Some(v) = data.notes {
            member.notes = Some(v);
        }
        member.updated_at = shared::util::now_millis();
        put_record(&mut members, id, &member)?;
        member
    };
    txn.commit()?;
    Ok(member)
}

/// Remove a member with no ledger or booking history
pub fn delete(storage: &ClubStorage, id: u64) -> RepoResult<()> {
    let txn = storage.begin_write()?;
    {
        let mut members = txn.open_table(MEMBERS)?;
        let member: Member = get_record(&members, id)?
            .ok_or_else(|| RepoError::not_found(ErrorCode::MemberNotFound, "Member", id))?;

        let has_movements = txn
            .open_table(MOVEMENTS)?
            .range((id, 0u64)..=(id, u64::MAX))?
            .next()
            .is_some();
        if has_movements {
            return Err(RepoError::InvalidState(
                ErrorCode::MemberHasMovements,
                format!("Member {} has ledger movements and cannot be deleted", member.code),
            ));
        }

        let reservations: Vec<Reservation> = all_records(&txn.open_table(RESERVATIONS)?)?;
        let refinancings: Vec<shared::models::Refinancing> =
            all_records(&txn.open_table(REFINANCINGS)?)?;
        if reservations.iter().any(|r| r.member_id == id)
            || refinancings.iter().any(|r| r.member_id == id)
        {
            return Err(RepoError::InvalidState(
                ErrorCode::MemberHasMovements,
                format!("Member {} has reservations or refinancings and cannot be deleted", member.code),
            ));
        }

        members.remove(id)?;
        txn.open_table(MEMBER_CODES)?.remove(member.code.as_str())?;
    }
    txn.commit()?;

    tracing::info!(member_id = id, "Member deleted");
    Ok(())
}

/// Ensure the member exists inside a write transaction
pub(crate) fn require_member(txn: &WriteTransaction, id: u64) -> RepoResult<Member> {
    get_record(&txn.open_table(MEMBERS)?, id)?
        .ok_or_else(|| RepoError::not_found(ErrorCode::MemberNotFound, "Member", id))
}

/// Next `S-00001` code not already taken
pub(crate) fn mint_member_code(
    txn: &WriteTransaction,
    codes: &Table<'_, &'static str, u64>,
) -> RepoResult<String> {
    loop {
        let n = next_sequence(txn, seq::MEMBER_CODE)?;
        let code = format!("S-{:05}", n);
        if codes.get(code.as_str())?.is_none() {
            return Ok(code);
        }
    }
}

fn view(member: Member, movements: &[Movement], today: NaiveDate) -> MemberView {
    MemberView {
        status: ledger::derive_status(movements, today),
        balance: ledger::compute_balance(movements, today),
        member,
    }
}

fn matches_text(member: &Member, needle: &str) -> bool {
    [
        Some(member.code.as_str()),
        Some(member.first_name.as_str()),
        Some(member.last_name.as_str()),
        Some(member.document.as_str()),
        member.email.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
        || member.full_name().to_lowercase().contains(needle)
}

fn check_catalog_refs(
    txn: &WriteTransaction,
    category_id: Option<u64>,
    service_ids: &[u64],
) -> RepoResult<()> {
    if let Some(category_id) = category_id
        && get_record::<Category>(&txn.open_table(CATEGORIES)?, category_id)?.is_none()
    {
        return Err(RepoError::not_found(
            ErrorCode::CategoryNotFound,
            "Category",
            category_id,
        ));
    }
    let services = txn.open_table(SERVICES)?;
    for &service_id in service_ids {
        if get_record::<Service>(&services, service_id)?.is_none() {
            return Err(RepoError::not_found(
                ErrorCode::ServiceNotFound,
                "Service",
                service_id,
            ));
        }
    }
    Ok(())
}

fn dedup(mut ids: Vec<u64>) -> Vec<u64> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    pub fn new_member(first_name: &str) -> MemberCreate {
        MemberCreate {
            code: None,
            first_name: first_name.to_string(),
            last_name: "Benítez".to_string(),
            document: format!("CI-{first_name}"),
            email: None,
            phone: None,
            address: None,
            category_id: None,
            service_ids: Vec::new(),
            joined_on: None,
            notes: None,
        }
    }
}
