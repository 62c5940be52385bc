//! Store integrity check and repair
//!
//! The check is a pure function over a [`StoreSnapshot`]; repair loads the
//! snapshot inside one write transaction, fixes what it can and writes the
//! touched records back before committing.

use std::collections::{BTreeMap, HashMap};

use redb::ReadableTable;
use serde::Serialize;
use shared::models::{Allocation, Movement, MovementKind, ReservationPayment};

use super::repository::RepoResult;
use super::repository::member::mint_member_code;
use super::snapshot::{StoreSnapshot, load_snapshot};
use super::storage::{
    ClubStorage, MEMBER_CODES, MEMBERS, MOVEMENTS, RESERVATIONS, ensure_sequence_at_least,
    put_child, put_record, seq,
};
use crate::reservations::apply_payments;

/// Allocation that points at no debit of its member, or carries a
/// non-positive amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedAllocation {
    pub member_id: u64,
    pub credit_id: u64,
    pub debit_id: u64,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverAllocation {
    pub member_id: u64,
    pub movement_id: u64,
    pub amount: i64,
    pub allocated: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCode {
    pub code: String,
    pub member_ids: Vec<u64>,
}

/// Reservation whose `pagado` is below the sum of its payments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagadoMismatch {
    pub reservation_id: u64,
    pub stored: i64,
    pub actual: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaggingSequence {
    pub name: String,
    pub current: u64,
    pub required: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub orphaned_allocations: Vec<OrphanedAllocation>,
    pub over_allocated_credits: Vec<OverAllocation>,
    pub over_allocated_debits: Vec<OverAllocation>,
    pub duplicate_member_codes: Vec<DuplicateCode>,
    pub pagado_mismatches: Vec<PagadoMismatch>,
    pub lagging_sequences: Vec<LaggingSequence>,
    pub healthy: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairResult {
    pub allocations_removed: usize,
    pub allocations_trimmed: usize,
    pub reservations_recomputed: Vec<u64>,
    pub members_recoded: Vec<(u64, String)>,
    pub sequences_bumped: Vec<String>,
    /// State after the repair
    pub integrity: IntegrityReport,
}

fn code_number(code: &str, prefix: &str) -> Option<u64> {
    code.strip_prefix(prefix)?.parse().ok()
}

fn max_of(values: impl Iterator<Item = u64>) -> u64 {
    values.max().unwrap_or(0)
}

/// Lowest value each sequence must hold so the next id or code it mints is
/// unused
pub fn sequence_floors(snapshot: &StoreSnapshot) -> Vec<(&'static str, u64)> {
    let s = snapshot;
    vec![
        (seq::MEMBERS, max_of(s.members.iter().map(|m| m.id))),
        (
            seq::MEMBER_CODE,
            max_of(s.members.iter().filter_map(|m| code_number(&m.code, "S-"))),
        ),
        (seq::USERS, max_of(s.users.iter().map(|u| u.user.id))),
        (seq::MOVEMENTS, max_of(s.movements.iter().map(|m| m.id))),
        (seq::PAYMENTS, max_of(s.payments.iter().map(|p| p.id))),
        (
            seq::RECEIPT,
            max_of(s.payments.iter().filter_map(|p| code_number(&p.receipt_number, "REC-"))),
        ),
        (seq::RESERVATIONS, max_of(s.reservations.iter().map(|r| r.id))),
        (
            seq::RESERVATION_PAYMENTS,
            max_of(s.reservation_payments.iter().map(|p| p.id)),
        ),
        (
            seq::RESERVATION_RECEIPT,
            max_of(s.reservation_payments.iter().filter_map(|p| code_number(&p.receipt, "RP-"))),
        ),
        (seq::SERVICES, max_of(s.services.iter().map(|e| e.id))),
        (seq::CATEGORIES, max_of(s.categories.iter().map(|e| e.id))),
        (seq::COLLECTORS, max_of(s.collectors.iter().map(|e| e.id))),
        (
            seq::COLLECTOR_CODE,
            max_of(s.collectors.iter().filter_map(|c| code_number(&c.code, "COB-"))),
        ),
        (seq::RESOURCES, max_of(s.resources.iter().map(|e| e.id))),
        (seq::REFINANCINGS, max_of(s.refinancings.iter().map(|e| e.id))),
    ]
}

fn debit_amounts(movements: &[Movement]) -> HashMap<(u64, u64), i64> {
    movements
        .iter()
        .filter(|m| m.kind == MovementKind::Debit)
        .map(|m| ((m.member_id, m.id), m.amount))
        .collect()
}

fn payments_by_reservation(payments: &[ReservationPayment]) -> HashMap<u64, Vec<ReservationPayment>> {
    let mut grouped: HashMap<u64, Vec<ReservationPayment>> = HashMap::new();
    for payment in payments {
        grouped.entry(payment.reservation_id).or_default().push(payment.clone());
    }
    grouped
}

/// Inspect a snapshot without changing anything
pub fn check(snapshot: &StoreSnapshot) -> IntegrityReport {
    let mut report = IntegrityReport::default();
    let debits = debit_amounts(&snapshot.movements);
    let mut allocated_to_debit: BTreeMap<(u64, u64), i64> = BTreeMap::new();

    for credit in snapshot.movements.iter().filter(|m| m.kind == MovementKind::Credit) {
        let mut allocated: i64 = 0;
        for allocation in &credit.allocations {
            let key = (credit.member_id, allocation.debit_id);
            if allocation.amount <= 0 || !debits.contains_key(&key) {
                report.orphaned_allocations.push(OrphanedAllocation {
                    member_id: credit.member_id,
                    credit_id: credit.id,
                    debit_id: allocation.debit_id,
                    amount: allocation.amount,
                });
                continue;
            }
            allocated = allocated.saturating_add(allocation.amount);
            let to_debit = allocated_to_debit.entry(key).or_insert(0);
            *to_debit = to_debit.saturating_add(allocation.amount);
        }
        if allocated > credit.amount {
            report.over_allocated_credits.push(OverAllocation {
                member_id: credit.member_id,
                movement_id: credit.id,
                amount: credit.amount,
                allocated,
            });
        }
    }

    for ((member_id, debit_id), allocated) in allocated_to_debit {
        let amount = debits.get(&(member_id, debit_id)).copied().unwrap_or(0);
        if allocated > amount {
            report.over_allocated_debits.push(OverAllocation {
                member_id,
                movement_id: debit_id,
                amount,
                allocated,
            });
        }
    }

    let mut by_code: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
    for member in &snapshot.members {
        by_code.entry(member.code.as_str()).or_default().push(member.id);
    }
    report.duplicate_member_codes = by_code
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(code, member_ids)| DuplicateCode {
            code: code.to_string(),
            member_ids,
        })
        .collect();

    let payments = payments_by_reservation(&snapshot.reservation_payments);
    for reservation in &snapshot.reservations {
        let actual: i64 = payments
            .get(&reservation.id)
            .map(|rows| paid_total(rows))
            .unwrap_or(0);
        if reservation.pagado < actual {
            report.pagado_mismatches.push(PagadoMismatch {
                reservation_id: reservation.id,
                stored: reservation.pagado,
                actual,
            });
        }
    }

    for (name, required) in sequence_floors(snapshot) {
        let current = snapshot.sequences.get(name).copied().unwrap_or(0);
        if current < required {
            report.lagging_sequences.push(LaggingSequence {
                name: name.to_string(),
                current,
                required,
            });
        }
    }

    report.healthy = report.orphaned_allocations.is_empty()
        && report.over_allocated_credits.is_empty()
        && report.over_allocated_debits.is_empty()
        && report.duplicate_member_codes.is_empty()
        && report.pagado_mismatches.is_empty()
        && report.lagging_sequences.is_empty();
    report
}

#[derive(Debug, Default)]
pub(crate) struct AllocationRepair {
    pub removed: usize,
    pub trimmed: usize,
    /// `(member_id, id)` of every credit that changed
    pub credits: Vec<(u64, u64)>,
}

/// Drop orphaned allocations and trim the rest so no credit or debit is
/// over-allocated. Credits are processed in key order, so earlier credits
/// keep their claim on a debit.
pub(crate) fn repair_allocations(movements: &mut [Movement]) -> AllocationRepair {
    let debits = debit_amounts(movements);
    let mut applied: HashMap<(u64, u64), i64> = HashMap::new();
    let mut repair = AllocationRepair::default();

    for credit in movements.iter_mut().filter(|m| m.kind == MovementKind::Credit) {
        let mut credit_left = credit.amount;
        let mut kept = Vec::with_capacity(credit.allocations.len());
        let mut changed = false;

        for allocation in &credit.allocations {
            let key = (credit.member_id, allocation.debit_id);
            let Some(&debit_amount) = debits.get(&key) else {
                repair.removed += 1;
                changed = true;
                continue;
            };
            let used = applied.entry(key).or_insert(0);
            let amount = allocation.amount.min(credit_left).min(debit_amount - *used);
            if amount <= 0 {
                repair.removed += 1;
                changed = true;
                continue;
            }
            if amount < allocation.amount {
                repair.trimmed += 1;
                changed = true;
            }
            *used += amount;
            credit_left -= amount;
            kept.push(Allocation {
                debit_id: allocation.debit_id,
                amount,
            });
        }

        if changed {
            credit.allocations = kept;
            repair.credits.push((credit.member_id, credit.id));
        }
    }
    repair
}

/// Read-only integrity report of the live store
pub fn inspect(storage: &ClubStorage) -> RepoResult<IntegrityReport> {
    let txn = storage.begin_read()?;
    Ok(check(&load_snapshot!(&txn)))
}

fn paid_total(rows: &[ReservationPayment]) -> i64 {
    rows.iter().fold(0i64, |sum, p| sum.saturating_add(p.amount))
}

/// Fix every finding [`check`] reports, in one transaction
pub fn repair(storage: &ClubStorage, now: i64) -> RepoResult<RepairResult> {
    let txn = storage.begin_write()?;
    let mut snapshot = load_snapshot!(&txn);
    let mut result = RepairResult::default();

    // Sequences first so re-minted codes cannot collide
    for (name, floor) in sequence_floors(&snapshot) {
        if ensure_sequence_at_least(&txn, name, floor)? {
            result.sequences_bumped.push(name.to_string());
        }
    }

    let allocations = repair_allocations(&mut snapshot.movements);
    if !allocations.credits.is_empty() {
        let mut table = txn.open_table(MOVEMENTS)?;
        for movement in snapshot
            .movements
            .iter()
            .filter(|m| allocations.credits.contains(&(m.member_id, m.id)))
        {
            put_child(&mut table, movement.member_id, movement.id, movement)?;
        }
    }
    result.allocations_removed = allocations.removed;
    result.allocations_trimmed = allocations.trimmed;

    {
        let payments = payments_by_reservation(&snapshot.reservation_payments);
        let mut table = txn.open_table(RESERVATIONS)?;
        for reservation in &mut snapshot.reservations {
            let rows = payments.get(&reservation.id).map(Vec::as_slice).unwrap_or(&[]);
            let actual = paid_total(rows);
            if reservation.pagado < actual {
                apply_payments(reservation, rows, now);
                put_record(&mut table, reservation.id, reservation)?;
                result.reservations_recomputed.push(reservation.id);
            }
        }
    }

    {
        // Rebuild the code index; the lowest id keeps a contested code
        txn.delete_table(MEMBER_CODES)?;
        let mut codes = txn.open_table(MEMBER_CODES)?;
        let mut members = txn.open_table(MEMBERS)?;
        let mut duplicates = Vec::new();
        for member in &snapshot.members {
            if codes.get(member.code.as_str())?.is_some() {
                duplicates.push(member.clone());
            } else {
                codes.insert(member.code.as_str(), member.id)?;
            }
        }
        for mut member in duplicates {
            member.code = mint_member_code(&txn, &codes)?;
            member.updated_at = now;
            codes.insert(member.code.as_str(), member.id)?;
            put_record(&mut members, member.id, &member)?;
            result.members_recoded.push((member.id, member.code));
        }
    }

    result.integrity = check(&load_snapshot!(&txn));
    txn.commit()?;

    tracing::info!(
        allocations_removed = result.allocations_removed,
        allocations_trimmed = result.allocations_trimmed,
        reservations = result.reservations_recomputed.len(),
        recoded = result.members_recoded.len(),
        sequences = result.sequences_bumped.len(),
        "Store repaired"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::allocation::test_support::{credit, date, debit};
    use crate::reservations::lifecycle::test_support::reservation;
    use shared::models::{Member, PaymentMethod, ReservationStatus};

    fn member(id: u64, code: &str) -> Member {
        Member {
            id,
            code: code.to_string(),
            first_name: format!("Socio{id}"),
            last_name: "Prueba".to_string(),
            document: format!("{id}00000"),
            email: None,
            phone: None,
            address: None,
            category_id: None,
            service_ids: Vec::new(),
            joined_on: date(2020, 1, 1),
            active: true,
            notes: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn reservation_payment(id: u64, reservation_id: u64, amount: i64) -> ReservationPayment {
        ReservationPayment {
            id,
            reservation_id,
            receipt: format!("RP-{id:06}"),
            amount,
            method: PaymentMethod::Transferencia,
            date: date(2025, 5, 1),
            notes: None,
            created_at: 0,
        }
    }

    fn consistent_sequences(snapshot: &mut StoreSnapshot) {
        snapshot.sequences = sequence_floors(snapshot)
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
    }

    #[test]
    fn test_clean_snapshot_is_healthy() {
        let mut snapshot = StoreSnapshot {
            members: vec![member(1, "S-00001")],
            movements: vec![
                debit(1, 100_000, date(2025, 1, 10)),
                credit(2, 60_000, &[(1, 60_000)]),
            ],
            ..Default::default()
        };
        consistent_sequences(&mut snapshot);
        let report = check(&snapshot);
        assert!(report.healthy, "{report:?}");
    }

    #[test]
    fn test_check_reports_every_finding() {
        let mut snapshot = StoreSnapshot {
            members: vec![member(1, "S-00001"), member(2, "S-00001")],
            movements: vec![
                debit(1, 100_000, date(2025, 1, 10)),
                credit(2, 50_000, &[(1, 80_000), (99, 5_000)]),
                credit(3, 50_000, &[(1, 40_000)]),
            ],
            reservations: vec![reservation(1, ReservationStatus::Pending, 0, 10)],
            reservation_payments: vec![reservation_payment(1, 1, 200_000)],
            ..Default::default()
        };
        consistent_sequences(&mut snapshot);
        snapshot.sequences.insert(seq::MEMBERS.to_string(), 1);

        let report = check(&snapshot);
        assert!(!report.healthy);
        assert_eq!(report.orphaned_allocations.len(), 1);
        assert_eq!(report.orphaned_allocations[0].debit_id, 99);
        assert_eq!(report.over_allocated_credits.len(), 1);
        assert_eq!(report.over_allocated_credits[0].movement_id, 2);
        assert_eq!(
            report.over_allocated_debits,
            vec![OverAllocation {
                member_id: 1,
                movement_id: 1,
                amount: 100_000,
                allocated: 120_000,
            }]
        );
        assert_eq!(report.duplicate_member_codes[0].member_ids, vec![1, 2]);
        assert_eq!(report.pagado_mismatches[0].actual, 200_000);
        assert_eq!(report.lagging_sequences[0].name, seq::MEMBERS);
        assert_eq!(report.lagging_sequences[0].required, 2);
    }

    #[test]
    fn test_repair_allocations_caps_credit_then_debit() {
        let mut movements = vec![
            debit(1, 100_000, date(2025, 1, 10)),
            credit(2, 50_000, &[(1, 80_000), (99, 5_000)]),
            credit(3, 80_000, &[(1, 70_000)]),
        ];
        let repair = repair_allocations(&mut movements);

        assert_eq!(repair.removed, 1);
        assert_eq!(repair.trimmed, 2);
        assert_eq!(repair.credits, vec![(1, 2), (1, 3)]);
        assert_eq!(movements[1].allocations, vec![Allocation { debit_id: 1, amount: 50_000 }]);
        assert_eq!(movements[2].allocations, vec![Allocation { debit_id: 1, amount: 50_000 }]);
    }

    #[test]
    fn test_repair_allocations_leaves_valid_credits_alone() {
        let mut movements = vec![
            debit(1, 100_000, date(2025, 1, 10)),
            credit(2, 30_000, &[(1, 30_000)]),
        ];
        let repair = repair_allocations(&mut movements);
        assert!(repair.credits.is_empty());
        assert_eq!(repair.removed + repair.trimmed, 0);
    }

    #[test]
    fn test_sequence_floors_read_code_suffixes() {
        let snapshot = StoreSnapshot {
            members: vec![member(3, "S-00120"), member(4, "LEGACY")],
            ..Default::default()
        };
        let floors: HashMap<_, _> = sequence_floors(&snapshot).into_iter().collect();
        assert_eq!(floors[seq::MEMBERS], 4);
        assert_eq!(floors[seq::MEMBER_CODE], 120);
        assert_eq!(floors[seq::PAYMENTS], 0);
    }

    #[test]
    fn test_repair_on_live_store() {
        use crate::db::snapshot::import;

        let storage = ClubStorage::open_in_memory().unwrap();
        let snapshot = StoreSnapshot {
            members: vec![member(1, "S-00001"), member(2, "S-00002")],
            movements: vec![
                debit(1, 100_000, date(2025, 1, 10)),
                credit(2, 150_000, &[(1, 150_000)]),
            ],
            reservations: vec![reservation(1, ReservationStatus::Pending, 0, 10)],
            reservation_payments: vec![reservation_payment(1, 1, 500_000)],
            ..Default::default()
        };
        let imported = import(&storage, snapshot).unwrap();
        assert!(!imported.integrity.healthy);

        let result = repair(&storage, 1_000).unwrap();
        assert_eq!(result.allocations_trimmed, 1);
        assert_eq!(result.reservations_recomputed, vec![1]);
        assert!(result.integrity.healthy, "{:?}", result.integrity);

        let after = inspect(&storage).unwrap();
        assert!(after.healthy);
        let exported = crate::db::snapshot::export(&storage).unwrap();
        assert_eq!(exported.reservations[0].status, ReservationStatus::Confirmed);
        assert_eq!(exported.reservations[0].pagado, 500_000);
    }

    #[test]
    fn test_repair_remints_duplicate_codes() {
        use crate::db::snapshot::import;

        let storage = ClubStorage::open_in_memory().unwrap();
        let snapshot = StoreSnapshot {
            members: vec![member(1, "S-00001"), member(2, "S-00002")],
            ..Default::default()
        };
        import(&storage, snapshot).unwrap();

        // Duplicate written behind the code index
        let txn = storage.begin_write().unwrap();
        {
            let mut members = txn.open_table(MEMBERS).unwrap();
            put_record(&mut members, 2, &member(2, "S-00001")).unwrap();
        }
        txn.commit().unwrap();
        assert_eq!(inspect(&storage).unwrap().duplicate_member_codes.len(), 1);

        let result = repair(&storage, 1_000).unwrap();
        assert_eq!(result.members_recoded, vec![(2, "S-00003".to_string())]);
        assert!(result.integrity.healthy, "{:?}", result.integrity);

        let txn = storage.begin_read().unwrap();
        let codes = txn.open_table(MEMBER_CODES).unwrap();
        assert_eq!(codes.get("S-00001").unwrap().unwrap().value(), 1);
        assert_eq!(codes.get("S-00003").unwrap().unwrap().value(), 2);
    }
}
