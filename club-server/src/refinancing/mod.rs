//! Refinancing plans
//!
//! [`calculator`] builds schedules; the functions here apply state changes
//! to a stored plan. Only ACTIVA plans accept changes.

pub mod calculator;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{InstallmentStatus, Refinancing, RefinancingStatus};

pub use calculator::{RULES, calculate, validate};

fn ensure_active(refinancing: &Refinancing) -> AppResult<()> {
    if refinancing.status != RefinancingStatus::Activa {
        return Err(AppError::with_message(
            ErrorCode::RefinancingClosed,
            format!(
                "Refinancing {} is {:?} and cannot be changed",
                refinancing.id, refinancing.status
            ),
        ));
    }
    Ok(())
}

/// Mark installment `number` paid. The plan completes with its last
/// pending installment.
pub fn pay_installment(refinancing: &mut Refinancing, number: u32, now: i64) -> AppResult<()> {
    ensure_active(refinancing)?;

    let installment = refinancing
        .installments
        .iter_mut()
        .find(|i| i.number == number)
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::InstallmentNotFound,
                format!("Installment {} not found", number),
            )
        })?;
    if installment.status == InstallmentStatus::Pagada {
        return Err(AppError::with_message(
            ErrorCode::InstallmentAlreadyPaid,
            format!("Installment {} is already paid", number),
        ));
    }
    installment.status = InstallmentStatus::Pagada;
    installment.paid_at = Some(now);

    if refinancing
        .installments
        .iter()
        .all(|i| i.status == InstallmentStatus::Pagada)
    {
        refinancing.status = RefinancingStatus::Completada;
    }
    refinancing.updated_at = now;
    Ok(())
}

pub fn cancel(refinancing: &mut Refinancing, now: i64) -> AppResult<()> {
    ensure_active(refinancing)?;
    refinancing.status = RefinancingStatus::Cancelada;
    refinancing.updated_at = now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::models::RefinancingTerms;

    fn plan() -> Refinancing {
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let terms = RefinancingTerms {
            principal: 600_000,
            down_payment_percent: 0,
            installment_count: 2,
            first_due_date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
        };
        let schedule = calculate(&terms, today).unwrap();
        Refinancing {
            id: 1,
            member_id: 3,
            principal: schedule.principal,
            down_payment_percent: 0,
            down_payment: schedule.down_payment,
            financed_amount: schedule.financed_amount,
            installment_count: 2,
            first_due_date: terms.first_due_date,
            installments: schedule.installments,
            status: RefinancingStatus::Activa,
            notes: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_paying_all_installments_completes_plan() {
        let mut refinancing = plan();
        pay_installment(&mut refinancing, 1, 10).unwrap();
        assert_eq!(refinancing.status, RefinancingStatus::Activa);
        assert_eq!(refinancing.paid_total(), 300_000);

        pay_installment(&mut refinancing, 2, 20).unwrap();
        assert_eq!(refinancing.status, RefinancingStatus::Completada);
        assert_eq!(refinancing.installments[1].paid_at, Some(20));
        assert_eq!(refinancing.updated_at, 20);
    }

    #[test]
    fn test_paying_twice_is_rejected() {
        let mut refinancing = plan();
        pay_installment(&mut refinancing, 1, 10).unwrap();
        let err = pay_installment(&mut refinancing, 1, 11).unwrap_err();
        assert_eq!(err.code, ErrorCode::InstallmentAlreadyPaid);
        assert_eq!(refinancing.installments[0].paid_at, Some(10));
    }

    #[test]
    fn test_unknown_installment() {
        let err = pay_installment(&mut plan(), 9, 10).unwrap_err();
        assert_eq!(err.code, ErrorCode::InstallmentNotFound);
    }

    #[test]
    fn test_cancelled_plan_is_closed() {
        let mut refinancing = plan();
        cancel(&mut refinancing, 5).unwrap();
        assert_eq!(refinancing.status, RefinancingStatus::Cancelada);

        let err = pay_installment(&mut refinancing, 1, 6).unwrap_err();
        assert_eq!(err.code, ErrorCode::RefinancingClosed);
        assert_eq!(
            cancel(&mut refinancing, 7).unwrap_err().code,
            ErrorCode::RefinancingClosed
        );
    }
}
