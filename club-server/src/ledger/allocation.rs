//! CREDIT → DEBIT allocation rules
//!
//! A CREDIT may be split across several DEBITs of the same member. Every
//! write is checked against the member's current movements:
//!
//! - each allocation amount is positive
//! - each `debitId` names an existing DEBIT of that member
//! - the allocations of one CREDIT never exceed its amount
//! - the allocations referencing one DEBIT never exceed its amount

use std::collections::HashMap;

use shared::error::{AppError, ErrorCode};
use shared::models::{Allocation, Movement, MovementKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("Allocation to debit {debit_id} must be positive")]
    NonPositive { debit_id: u64 },

    #[error("Debit {0} does not exist for this member")]
    UnknownDebit(u64),

    #[error("Movement {0} is not a debit")]
    NotADebit(u64),

    #[error("Allocations total {allocated} but the credit is {amount}")]
    ExceedsCredit { allocated: i64, amount: i64 },

    #[error("Debit {debit_id} has {outstanding} outstanding, {requested} requested")]
    ExceedsOutstanding {
        debit_id: u64,
        outstanding: i64,
        requested: i64,
    },
}

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        let code = match &err {
            AllocationError::NonPositive { .. }
            | AllocationError::UnknownDebit(_)
            | AllocationError::NotADebit(_) => ErrorCode::AllocationInvalid,
            AllocationError::ExceedsCredit { .. } => ErrorCode::AllocationExceedsCredit,
            AllocationError::ExceedsOutstanding { .. } => {
                ErrorCode::AllocationExceedsOutstanding
            }
        };
        AppError::with_message(code, err.to_string())
    }
}

/// Sum of allocations referencing each DEBIT id.
///
/// Allocations pointing at ids that are not DEBITs of `movements` are still
/// counted under their id; callers decide whether such an id exists.
pub fn allocated_by_debit(movements: &[Movement]) -> HashMap<u64, i64> {
    let mut allocated: HashMap<u64, i64> = HashMap::new();
    for credit in movements.iter().filter(|m| m.is_credit()) {
        for allocation in &credit.allocations {
            let total = allocated.entry(allocation.debit_id).or_default();
            *total = total.saturating_add(allocation.amount);
        }
    }
    allocated
}

/// Remaining unpaid amount of every DEBIT, keyed by id (never negative)
pub fn outstanding_by_debit(movements: &[Movement]) -> HashMap<u64, i64> {
    let allocated = allocated_by_debit(movements);
    movements
        .iter()
        .filter(|m| m.is_debit())
        .map(|debit| {
            let paid = allocated.get(&debit.id).copied().unwrap_or(0);
            (debit.id, debit.amount.saturating_sub(paid).max(0))
        })
        .collect()
}

/// Check a new CREDIT's allocations against the member's existing movements
pub fn validate_allocations(
    movements: &[Movement],
    credit_amount: i64,
    allocations: &[Allocation],
) -> Result<(), AllocationError> {
    let kinds: HashMap<u64, MovementKind> = movements.iter().map(|m| (m.id, m.kind)).collect();
    let outstanding = outstanding_by_debit(movements);

    let mut requested: HashMap<u64, i64> = HashMap::new();
    let mut total = 0i64;
    for allocation in allocations {
        if allocation.amount <= 0 {
            return Err(AllocationError::NonPositive {
                debit_id: allocation.debit_id,
            });
        }
        match kinds.get(&allocation.debit_id) {
            None => return Err(AllocationError::UnknownDebit(allocation.debit_id)),
            Some(MovementKind::Credit) => {
                return Err(AllocationError::NotADebit(allocation.debit_id));
            }
            Some(MovementKind::Debit) => {}
        }
        let wanted = requested.entry(allocation.debit_id).or_default();
        let (Some(next_wanted), Some(next_total)) = (
            wanted.checked_add(allocation.amount),
            total.checked_add(allocation.amount),
        ) else {
            return Err(AllocationError::ExceedsCredit {
                allocated: i64::MAX,
                amount: credit_amount,
            });
        };
        *wanted = next_wanted;
        total = next_total;
    }

    if total > credit_amount {
        return Err(AllocationError::ExceedsCredit {
            allocated: total,
            amount: credit_amount,
        });
    }

    let mut debit_ids: Vec<_> = requested.keys().copied().collect();
    debit_ids.sort_unstable();
    for debit_id in debit_ids {
        let available = outstanding.get(&debit_id).copied().unwrap_or(0);
        let wanted = requested[&debit_id];
        if wanted > available {
            return Err(AllocationError::ExceedsOutstanding {
                debit_id,
                outstanding: available,
                requested: wanted,
            });
        }
    }

    Ok(())
}

/// FIFO allocation of `amount` over outstanding DEBITs, oldest due date
/// first, ties broken by id. Any remainder stays unallocated.
pub fn auto_allocate(movements: &[Movement], amount: i64) -> Vec<Allocation> {
    let outstanding = outstanding_by_debit(movements);
    let mut debits: Vec<&Movement> = movements
        .iter()
        .filter(|m| m.is_debit() && outstanding.get(&m.id).copied().unwrap_or(0) > 0)
        .collect();
    debits.sort_by_key(|m| (m.effective_due_date(), m.id));

    let mut remaining = amount;
    let mut allocations = Vec::new();
    for debit in debits {
        if remaining <= 0 {
            break;
        }
        let open = outstanding.get(&debit.id).copied().unwrap_or(0);
        let take = open.min(remaining);
        allocations.push(Allocation {
            debit_id: debit.id,
            amount: take,
        });
        remaining -= take;
    }
    allocations
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use shared::models::{Allocation, Movement, MovementKind};

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn debit(id: u64, amount: i64, due: NaiveDate) -> Movement {
        Movement {
            id,
            member_id: 1,
            kind: MovementKind::Debit,
            amount,
            concept: format!("Cuota {id}"),
            date: due,
            due_date: Some(due),
            period: None,
            source: None,
            payment_id: None,
            allocations: Vec::new(),
            created_at: 0,
        }
    }

    pub fn credit(id: u64, amount: i64, allocations: &[(u64, i64)]) -> Movement {
        Movement {
            id,
            member_id: 1,
            kind: MovementKind::Credit,
            amount,
            concept: "Pago".to_string(),
            date: date(2025, 1, 1),
            due_date: None,
            period: None,
            source: None,
            payment_id: None,
            allocations: allocations
                .iter()
                .map(|&(debit_id, amount)| Allocation { debit_id, amount })
                .collect(),
            created_at: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn ledger() -> Vec<Movement> {
        vec![
            debit(1, 100_000, date(2025, 1, 10)),
            debit(2, 100_000, date(2025, 2, 10)),
            credit(3, 60_000, &[(1, 60_000)]),
        ]
    }

    #[test]
    fn test_outstanding_nets_allocations() {
        let outstanding = outstanding_by_debit(&ledger());
        assert_eq!(outstanding[&1], 40_000);
        assert_eq!(outstanding[&2], 100_000);
    }

    #[test]
    fn test_valid_split_allocation() {
        let allocations = [
            Allocation {
                debit_id: 1,
                amount: 40_000,
            },
            Allocation {
                debit_id: 2,
                amount: 10_000,
            },
        ];
        assert_eq!(validate_allocations(&ledger(), 50_000, &allocations), Ok(()));
    }

    #[test]
    fn test_rejects_allocations_above_credit() {
        let allocations = [Allocation {
            debit_id: 2,
            amount: 80_000,
        }];
        assert_eq!(
            validate_allocations(&ledger(), 50_000, &allocations),
            Err(AllocationError::ExceedsCredit {
                allocated: 80_000,
                amount: 50_000
            })
        );
    }

    #[test]
    fn test_rejects_allocations_above_outstanding() {
        // Two entries for the same debit are summed before the check
        let allocations = [
            Allocation {
                debit_id: 1,
                amount: 30_000,
            },
            Allocation {
                debit_id: 1,
                amount: 20_000,
            },
        ];
        assert_eq!(
            validate_allocations(&ledger(), 100_000, &allocations),
            Err(AllocationError::ExceedsOutstanding {
                debit_id: 1,
                outstanding: 40_000,
                requested: 50_000
            })
        );
    }

    #[test]
    fn test_rejects_allocations_that_overflow() {
        let allocations = [
            Allocation {
                debit_id: 1,
                amount: i64::MAX,
            },
            Allocation {
                debit_id: 1,
                amount: 2,
            },
        ];
        assert!(matches!(
            validate_allocations(&ledger(), 100, &allocations),
            Err(AllocationError::ExceedsCredit { amount: 100, .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_and_credit_targets() {
        let unknown = [Allocation {
            debit_id: 99,
            amount: 1,
        }];
        assert_eq!(
            validate_allocations(&ledger(), 10, &unknown),
            Err(AllocationError::UnknownDebit(99))
        );

        let credit_target = [Allocation {
            debit_id: 3,
            amount: 1,
        }];
        assert_eq!(
            validate_allocations(&ledger(), 10, &credit_target),
            Err(AllocationError::NotADebit(3))
        );

        let zero = [Allocation {
            debit_id: 1,
            amount: 0,
        }];
        assert_eq!(
            validate_allocations(&ledger(), 10, &zero),
            Err(AllocationError::NonPositive { debit_id: 1 })
        );
    }

    #[test]
    fn test_auto_allocate_is_fifo_by_due_date() {
        let mut movements = ledger();
        // Older due date but higher id
        movements.push(debit(4, 25_000, date(2024, 12, 10)));

        let allocations = auto_allocate(&movements, 80_000);
        assert_eq!(
            allocations,
            vec![
                Allocation {
                    debit_id: 4,
                    amount: 25_000
                },
                Allocation {
                    debit_id: 1,
                    amount: 40_000
                },
                Allocation {
                    debit_id: 2,
                    amount: 15_000
                },
            ]
        );
        assert_eq!(validate_allocations(&movements, 80_000, &allocations), Ok(()));
    }

    #[test]
    fn test_auto_allocate_leaves_surplus_unallocated() {
        let allocations = auto_allocate(&ledger(), 500_000);
        let total: i64 = allocations.iter().map(|a| a.amount).sum();
        assert_eq!(total, 140_000);
    }

    #[test]
    fn test_allocation_error_maps_to_codes() {
        let err: AppError = AllocationError::UnknownDebit(5).into();
        assert_eq!(err.code, ErrorCode::AllocationInvalid);
        let err: AppError = AllocationError::ExceedsCredit {
            allocated: 2,
            amount: 1,
        }
        .into();
        assert_eq!(err.code, ErrorCode::AllocationExceedsCredit);
    }
}
