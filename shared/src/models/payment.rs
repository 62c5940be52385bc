//! Payment Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::movement::Allocation;

/// How the money was received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Efectivo,
    Transferencia,
    Tarjeta,
    Cheque,
}

/// Member payment. Creating one writes its CREDIT movement in the same
/// transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: u64,
    /// `REC-000001`
    pub receipt_number: String,
    pub member_id: u64,
    pub amount: i64,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    pub collector_id: Option<u64>,
    pub notes: Option<String>,
    /// CREDIT movement created for this payment
    pub movement_id: u64,
    /// Username of the operator who registered it
    pub created_by: String,
    pub created_at: i64,
}

/// Create payment payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCreate {
    pub member_id: u64,
    #[validate(range(min = 1_i64, max = 1_000_000_000_000_i64))]
    pub amount: i64,
    pub date: Option<NaiveDate>,
    pub method: PaymentMethod,
    pub collector_id: Option<u64>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
    /// Explicit allocations; FIFO over outstanding debits when absent
    #[validate(nested)]
    pub allocations: Option<Vec<Allocation>>,
}

/// Payment with the allocations of its CREDIT
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetail {
    #[serde(flatten)]
    pub payment: Payment,
    pub allocations: Vec<Allocation>,
}

/// `GET /api/payments` filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    pub member_id: Option<u64>,
    pub collector_id: Option<u64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_wire_format() {
        let method: PaymentMethod = serde_json::from_str("\"TRANSFERENCIA\"").unwrap();
        assert_eq!(method, PaymentMethod::Transferencia);
        assert!(serde_json::from_str::<PaymentMethod>("\"BITCOIN\"").is_err());
    }

    #[test]
    fn test_create_rejects_non_positive_amount() {
        let payload = PaymentCreate {
            member_id: 1,
            amount: 0,
            date: None,
            method: PaymentMethod::Efectivo,
            collector_id: None,
            notes: None,
            allocations: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_create_caps_amounts() {
        let mut payload = PaymentCreate {
            member_id: 1,
            amount: crate::models::MAX_AMOUNT,
            date: None,
            method: PaymentMethod::Efectivo,
            collector_id: None,
            notes: None,
            allocations: Some(vec![Allocation {
                debit_id: 1,
                amount: 100,
            }]),
        };
        assert!(payload.validate().is_ok());

        payload.amount = i64::MAX;
        assert!(payload.validate().is_err());

        // Allocations are checked one by one
        payload.amount = 100;
        payload.allocations = Some(vec![Allocation {
            debit_id: 1,
            amount: i64::MAX,
        }]);
        let err = crate::error::AppError::from(payload.validate().unwrap_err());
        assert_eq!(err.message, "allocations[0].amount: range");
    }
}
