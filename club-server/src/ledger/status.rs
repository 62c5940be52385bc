//! Member status and balance derivation
//!
//! Status is never stored. It is recomputed from the member's movements on
//! every read, so it cannot drift from the ledger.

use std::collections::HashSet;

use chrono::NaiveDate;
use shared::models::{MemberBalance, MemberStatus, Movement};

use super::allocation::outstanding_by_debit;

/// ATRASADO when any DEBIT has an outstanding balance and its due date is
/// strictly before `today`.
pub fn derive_status(movements: &[Movement], today: NaiveDate) -> MemberStatus {
    let outstanding = outstanding_by_debit(movements);
    let overdue = movements.iter().filter(|m| m.is_debit()).any(|debit| {
        outstanding.get(&debit.id).copied().unwrap_or(0) > 0 && debit.effective_due_date() < today
    });
    if overdue {
        MemberStatus::Atrasado
    } else {
        MemberStatus::AlDia
    }
}

/// Totals for the member balance view.
///
/// Allocations pointing at missing DEBITs are ignored, so such credit shows
/// up as unallocated.
pub fn compute_balance(movements: &[Movement], today: NaiveDate) -> MemberBalance {
    let outstanding = outstanding_by_debit(movements);
    let debit_ids: HashSet<u64> = movements
        .iter()
        .filter(|m| m.is_debit())
        .map(|m| m.id)
        .collect();

    let mut balance = MemberBalance::default();
    for movement in movements {
        if movement.is_debit() {
            balance.total_debits = balance.total_debits.saturating_add(movement.amount);
            let open = outstanding.get(&movement.id).copied().unwrap_or(0);
            balance.outstanding = balance.outstanding.saturating_add(open);
            if movement.effective_due_date() < today {
                balance.overdue = balance.overdue.saturating_add(open);
            }
        } else {
            balance.total_credits = balance.total_credits.saturating_add(movement.amount);
            let applied: i64 = movement
                .allocations
                .iter()
                .filter(|a| debit_ids.contains(&a.debit_id))
                .fold(0i64, |sum, a| sum.saturating_add(a.amount));
            let unapplied = movement.amount.saturating_sub(applied).max(0);
            balance.unallocated_credit = balance.unallocated_credit.saturating_add(unapplied);
        }
    }
    balance
}

#[cfg(test)]
mod tests {
    use super::super::allocation::test_support::*;
    use super::*;

    #[test]
    fn test_empty_ledger_is_al_dia() {
        assert_eq!(derive_status(&[], date(2025, 6, 1)), MemberStatus::AlDia);
    }

    #[test]
    fn test_unpaid_past_due_debit_is_atrasado() {
        let movements = vec![debit(1, 100_000, date(2025, 5, 10))];
        assert_eq!(
            derive_status(&movements, date(2025, 5, 11)),
            MemberStatus::Atrasado
        );
    }

    #[test]
    fn test_due_today_is_not_overdue() {
        let movements = vec![debit(1, 100_000, date(2025, 5, 10))];
        assert_eq!(
            derive_status(&movements, date(2025, 5, 10)),
            MemberStatus::AlDia
        );
    }

    #[test]
    fn test_fully_allocated_debit_is_al_dia() {
        let movements = vec![
            debit(1, 100_000, date(2025, 1, 10)),
            credit(2, 100_000, &[(1, 100_000)]),
        ];
        assert_eq!(
            derive_status(&movements, date(2025, 6, 1)),
            MemberStatus::AlDia
        );
    }

    #[test]
    fn test_unallocated_credit_does_not_settle_debit() {
        let movements = vec![
            debit(1, 100_000, date(2025, 1, 10)),
            credit(2, 100_000, &[]),
        ];
        assert_eq!(
            derive_status(&movements, date(2025, 6, 1)),
            MemberStatus::Atrasado
        );
    }

    #[test]
    fn test_status_is_deterministic() {
        let movements = vec![
            debit(1, 80_000, date(2025, 3, 10)),
            credit(2, 30_000, &[(1, 30_000)]),
        ];
        let today = date(2025, 4, 1);
        assert_eq!(
            derive_status(&movements, today),
            derive_status(&movements, today)
        );
    }

    #[test]
    fn test_balance_totals() {
        let movements = vec![
            debit(1, 100_000, date(2025, 1, 10)),
            debit(2, 50_000, date(2025, 9, 10)),
            credit(3, 120_000, &[(1, 100_000)]),
            // Orphaned allocation counts as unallocated
            credit(4, 10_000, &[(99, 10_000)]),
        ];
        let balance = compute_balance(&movements, date(2025, 6, 1));
        assert_eq!(
            balance,
            MemberBalance {
                total_debits: 150_000,
                total_credits: 130_000,
                outstanding: 50_000,
                overdue: 0,
                unallocated_credit: 30_000,
            }
        );
    }
}
