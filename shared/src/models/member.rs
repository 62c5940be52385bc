//! Member Model (socio)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Payment standing, derived from the ledger on every read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    AlDia,
    Atrasado,
}

/// Member entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: u64,
    pub code: String,
    pub first_name: String,
    pub last_name: String,
    /// Cédula de identidad
    pub document: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category_id: Option<u64>,
    #[serde(default)]
    pub service_ids: Vec<u64>,
    pub joined_on: NaiveDate,
    pub active: bool,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Create member payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MemberCreate {
    /// Minted from the member code sequence when absent
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(min = 1, max = 30))]
    pub document: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub address: Option<String>,
    pub category_id: Option<u64>,
    #[serde(default)]
    pub service_ids: Vec<u64>,
    pub joined_on: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Update member payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdate {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(min = 1, max = 30))]
    pub document: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub address: Option<String>,
    pub category_id: Option<u64>,
    pub service_ids: Option<Vec<u64>>,
    pub joined_on: Option<NaiveDate>,
    pub active: Option<bool>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Ledger totals for one member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberBalance {
    pub total_debits: i64,
    pub total_credits: i64,
    /// Sum of every DEBIT's unallocated remainder
    pub outstanding: i64,
    /// Part of `outstanding` already past due
    pub overdue: i64,
    /// Credit not yet applied to any DEBIT
    pub unallocated_credit: i64,
}

/// Member with derived status and balance (list/detail views)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    #[serde(flatten)]
    pub member: Member,
    pub status: MemberStatus,
    pub balance: MemberBalance,
}

/// `GET /api/members` filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberQuery {
    pub status: Option<MemberStatus>,
    /// Matches code, document or name (case-insensitive)
    pub q: Option<String>,
    pub active: Option<bool>,
}
