//! Refinancing schedule calculator
//!
//! Turns plan terms into a down payment plus monthly installments. The
//! rules in [`RULES`] are the only place bounds and messages are defined;
//! [`validate`] reports every failed rule and [`calculate`] refuses to run
//! until all of them pass.
//!
//! ```text
//! down_payment = round(principal * pct / 100)
//! financed     = principal - down_payment
//! installment  = round(financed / count) to ROUNDING_UNIT
//! last         = financed - installment * (count - 1)
//! ```

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use shared::models::{Installment, InstallmentStatus, RefinancingSchedule, RefinancingTerms};

use crate::utils::time::add_months;

pub const MAX_DOWN_PAYMENT_PERCENT: i64 = 80;
pub const MIN_INSTALLMENTS: i64 = 1;
pub const MAX_INSTALLMENTS: i64 = 12;

/// Installments are rounded to whole thousands of guaraníes
pub const ROUNDING_UNIT: i64 = 1_000;

/// A named business rule over the requested terms
pub struct Rule {
    pub field: &'static str,
    pub message: &'static str,
    check: fn(&RefinancingTerms, NaiveDate) -> bool,
}

impl Rule {
    pub fn holds(&self, terms: &RefinancingTerms, today: NaiveDate) -> bool {
        (self.check)(terms, today)
    }
}

pub static RULES: &[Rule] = &[
    Rule {
        field: "principal",
        message: "Principal must be greater than zero",
        check: |t, _| t.principal > 0,
    },
    Rule {
        field: "downPaymentPercent",
        message: "Down payment percent must be between 0 and 80",
        check: |t, _| (0..=MAX_DOWN_PAYMENT_PERCENT).contains(&t.down_payment_percent),
    },
    Rule {
        field: "installmentCount",
        message: "Installment count must be between 1 and 12",
        check: |t, _| (MIN_INSTALLMENTS..=MAX_INSTALLMENTS).contains(&t.installment_count),
    },
    Rule {
        field: "firstDueDate",
        message: "First due date must be after today",
        check: |t, today| t.first_due_date > today,
    },
    Rule {
        field: "principal",
        message: "Financed amount must allow at least 1 Gs per installment",
        check: |t, _| {
            // Only meaningful once the other numeric rules hold
            if t.principal <= 0
                || !(0..=MAX_DOWN_PAYMENT_PERCENT).contains(&t.down_payment_percent)
                || t.installment_count < MIN_INSTALLMENTS
            {
                return true;
            }
            t.principal - down_payment(t.principal, t.down_payment_percent) >= t.installment_count
        },
    },
];

/// Messages of every failed rule, in table order. Empty when valid.
pub fn validate(terms: &RefinancingTerms, today: NaiveDate) -> Vec<String> {
    RULES
        .iter()
        .filter(|rule| !rule.holds(terms, today))
        .map(|rule| format!("{}: {}", rule.field, rule.message))
        .collect()
}

/// Build the schedule, or return the failed rule messages
pub fn calculate(
    terms: &RefinancingTerms,
    today: NaiveDate,
) -> Result<RefinancingSchedule, Vec<String>> {
    let errors = validate(terms, today);
    if !errors.is_empty() {
        return Err(errors);
    }

    let down = down_payment(terms.principal, terms.down_payment_percent);
    let financed = terms.principal - down;
    let count = terms.installment_count;
    let amounts = split_installments(financed, count);

    let mut installments = Vec::with_capacity(amounts.len());
    for (index, amount) in amounts.into_iter().enumerate() {
        let due_date = add_months(terms.first_due_date, index as u32)
            .ok_or_else(|| vec!["firstDueDate: Schedule runs past the supported calendar".to_string()])?;
        installments.push(Installment {
            number: index as u32 + 1,
            amount,
            due_date,
            status: InstallmentStatus::Pendiente,
            paid_at: None,
        });
    }

    Ok(RefinancingSchedule {
        principal: terms.principal,
        down_payment: down,
        financed_amount: financed,
        installments,
    })
}

/// round(principal * pct / 100), half away from zero
pub fn down_payment(principal: i64, percent: i64) -> i64 {
    let value = Decimal::from(principal) * Decimal::from(percent) / Decimal::from(100);
    round_to_unit(value, 1)
}

/// Split `financed` into `count` installments whose sum is exactly
/// `financed`. Requires `financed >= count >= 1`.
fn split_installments(financed: i64, count: i64) -> Vec<i64> {
    let share = Decimal::from(financed) / Decimal::from(count);
    let regular = [ROUNDING_UNIT, 1]
        .into_iter()
        .map(|unit| round_to_unit(share, unit))
        .find(|&installment| installment > 0 && financed - installment * (count - 1) > 0)
        .unwrap_or(financed / count);

    let mut amounts = vec![regular; count as usize];
    if let Some(last) = amounts.last_mut() {
        *last = financed - regular * (count - 1);
    }
    amounts
}

fn round_to_unit(value: Decimal, unit: i64) -> i64 {
    let unit = Decimal::from(unit);
    let rounded = (value / unit).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    (rounded * unit).to_i64().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn terms(principal: i64, pct: i64, count: i64) -> RefinancingTerms {
        RefinancingTerms {
            principal,
            down_payment_percent: pct,
            installment_count: count,
            first_due_date: date(2025, 1, 31),
        }
    }

    fn today() -> NaiveDate {
        date(2025, 1, 1)
    }

    #[test]
    fn test_reference_schedule() {
        let schedule = calculate(&terms(1_000_000, 20, 3), today()).unwrap();
        assert_eq!(schedule.down_payment, 200_000);
        assert_eq!(schedule.financed_amount, 800_000);
        let amounts: Vec<i64> = schedule.installments.iter().map(|i| i.amount).collect();
        assert_eq!(amounts, vec![267_000, 267_000, 266_000]);
    }

    #[test]
    fn test_due_dates_are_monthly_and_clamped() {
        let schedule = calculate(&terms(1_000_000, 0, 3), today()).unwrap();
        let dates: Vec<NaiveDate> = schedule.installments.iter().map(|i| i.due_date).collect();
        assert_eq!(
            dates,
            vec![date(2025, 1, 31), date(2025, 2, 28), date(2025, 3, 31)]
        );
        assert_eq!(schedule.installments[2].number, 3);
        assert!(
            schedule
                .installments
                .iter()
                .all(|i| i.status == InstallmentStatus::Pendiente)
        );
    }

    #[test]
    fn test_schedule_always_reconciles() {
        for principal in [12, 13, 18, 999, 1_001, 77_777, 1_234_567, 50_000_000] {
            for pct in [0, 5, 33, 50, 80] {
                for count in 1..=12 {
                    let t = terms(principal, pct, count);
                    let Ok(schedule) = calculate(&t, today()) else {
                        continue;
                    };
                    let sum: i64 = schedule.installments.iter().map(|i| i.amount).sum();
                    assert_eq!(
                        schedule.down_payment + sum,
                        principal,
                        "{principal} {pct}% x{count}"
                    );
                    assert!(
                        schedule.installments.iter().all(|i| i.amount > 0),
                        "{principal} {pct}% x{count}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_small_amounts_fall_back_to_unit_rounding() {
        // 400 rounds to zero thousands
        let schedule = calculate(&terms(1_200, 0, 3), today()).unwrap();
        let amounts: Vec<i64> = schedule.installments.iter().map(|i| i.amount).collect();
        assert_eq!(amounts, vec![400, 400, 400]);

        // 1,000 each would overshoot: 2,500 - 3 * 1,000 < 0
        let schedule = calculate(&terms(2_500, 0, 4), today()).unwrap();
        let amounts: Vec<i64> = schedule.installments.iter().map(|i| i.amount).collect();
        assert_eq!(amounts, vec![625, 625, 625, 625]);
    }

    #[test]
    fn test_down_payment_rounds_half_away_from_zero() {
        assert_eq!(down_payment(1_000_005, 10), 100_001);
        assert_eq!(down_payment(15, 10), 2);
        assert_eq!(down_payment(1_000, 0), 0);
    }

    #[test]
    fn test_validation_lists_every_failure() {
        let t = RefinancingTerms {
            principal: 0,
            down_payment_percent: 90,
            installment_count: 13,
            first_due_date: today(),
        };
        let errors = validate(&t, today());
        assert_eq!(errors.len(), 4);
        assert!(errors[0].starts_with("principal:"));
        assert!(errors[3].starts_with("firstDueDate:"));
        assert_eq!(calculate(&t, today()).unwrap_err(), errors);
    }

    #[test]
    fn test_financed_amount_must_cover_installments() {
        let errors = validate(&terms(10, 50, 12), today());
        assert_eq!(
            errors,
            vec!["principal: Financed amount must allow at least 1 Gs per installment".to_string()]
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(validate(&terms(1_000_000, 80, 12), today()).is_empty());
        assert!(validate(&terms(1_000_000, 0, 1), today()).is_empty());
    }
}
