//! Ledger movement model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Movement direction (`tipo` on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    /// Charge owed by the member
    Debit,
    /// Money received from the member
    Credit,
}

/// Portion of a CREDIT applied to one DEBIT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub debit_id: u64,
    #[validate(range(min = 1_i64, max = 1_000_000_000_000_i64))]
    pub amount: i64,
}

/// Member-scoped ledger entry. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: u64,
    pub member_id: u64,
    #[serde(rename = "tipo")]
    pub kind: MovementKind,
    pub amount: i64,
    pub concept: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Billing period `YYYY-MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    /// Charge source key, e.g. `category:3` or `service:7`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allocations: Vec<Allocation>,
    pub created_at: i64,
}

impl Movement {
    pub fn is_debit(&self) -> bool {
        self.kind == MovementKind::Debit
    }

    pub fn is_credit(&self) -> bool {
        self.kind == MovementKind::Credit
    }

    /// Date after which an unpaid DEBIT counts as overdue
    pub fn effective_due_date(&self) -> NaiveDate {
        self.due_date.unwrap_or(self.date)
    }

    pub fn allocated_total(&self) -> i64 {
        self.allocations
            .iter()
            .fold(0i64, |sum, a| sum.saturating_add(a.amount))
    }
}

/// Manual movement payload (`POST /api/members/{id}/movements`)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MovementCreate {
    #[serde(rename = "tipo")]
    pub kind: MovementKind,
    #[validate(range(min = 1_i64, max = 1_000_000_000_000_i64))]
    pub amount: i64,
    #[validate(length(min = 1, max = 200))]
    pub concept: String,
    pub date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(equal = 7))]
    pub period: Option<String>,
    /// CREDIT only. Absent means FIFO auto-allocation; an empty list leaves
    /// the credit unallocated.
    #[validate(nested)]
    pub allocations: Option<Vec<Allocation>>,
}

/// `POST /api/charges/generate` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeGenerate {
    /// `YYYY-MM`
    pub period: String,
}

/// Outcome of a monthly charge run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRunResult {
    pub period: String,
    pub members: usize,
    pub created: usize,
    /// Charges already present for the same member, period and source
    pub skipped: usize,
}
