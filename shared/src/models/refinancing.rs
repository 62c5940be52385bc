//! Refinancing (installment plan) model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefinancingStatus {
    Activa,
    Completada,
    Cancelada,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentStatus {
    Pendiente,
    Pagada,
}

/// One scheduled payment of a refinancing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    /// 1-based
    pub number: u32,
    pub amount: i64,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
}

/// Requested plan terms.
///
/// Signed fields so that out-of-range input reaches rule validation instead
/// of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinancingTerms {
    pub principal: i64,
    pub down_payment_percent: i64,
    pub installment_count: i64,
    pub first_due_date: NaiveDate,
}

/// Computed amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinancingSchedule {
    pub principal: i64,
    pub down_payment: i64,
    pub financed_amount: i64,
    pub installments: Vec<Installment>,
}

/// Persisted refinancing plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refinancing {
    pub id: u64,
    pub member_id: u64,
    pub principal: i64,
    pub down_payment_percent: i64,
    pub down_payment: i64,
    pub financed_amount: i64,
    pub installment_count: u32,
    pub first_due_date: NaiveDate,
    pub installments: Vec<Installment>,
    pub status: RefinancingStatus,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Refinancing {
    pub fn paid_total(&self) -> i64 {
        self.installments
            .iter()
            .filter(|i| i.status == InstallmentStatus::Pagada)
            .map(|i| i.amount)
            .sum()
    }
}

/// Create refinancing payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinancingCreate {
    pub member_id: u64,
    #[serde(flatten)]
    pub terms: RefinancingTerms,
    pub notes: Option<String>,
}

/// `GET /api/refinancings` filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinancingQuery {
    pub member_id: Option<u64>,
    pub status: Option<RefinancingStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_flattens_terms() {
        let payload: RefinancingCreate = serde_json::from_value(serde_json::json!({
            "memberId": 7,
            "principal": 1_000_000,
            "downPaymentPercent": 20,
            "installmentCount": 3,
            "firstDueDate": "2030-01-15"
        }))
        .unwrap();
        assert_eq!(payload.member_id, 7);
        assert_eq!(payload.terms.installment_count, 3);
        assert!(payload.notes.is_none());
    }
}
