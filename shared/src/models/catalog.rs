//! Catalog models: services, member categories, collectors and venues

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Subscribable club service billed monthly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub monthly_fee: i64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0_i64, max = 1_000_000_000_000_i64))]
    pub monthly_fee: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0_i64, max = 1_000_000_000_000_i64))]
    pub monthly_fee: Option<i64>,
    pub active: Option<bool>,
}

/// Member category; `monthlyFee` is the cuota social
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub monthly_fee: i64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0_i64, max = 1_000_000_000_000_i64))]
    pub monthly_fee: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0_i64, max = 1_000_000_000_000_i64))]
    pub monthly_fee: Option<i64>,
    pub active: Option<bool>,
}

/// Cobrador
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collector {
    pub id: u64,
    /// `COB-001`
    pub code: String,
    pub name: String,
    pub phone: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CollectorCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CollectorUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub active: Option<bool>,
}

/// Bookable venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub capacity: Option<u32>,
    /// Share of the total required up front to confirm a booking
    pub deposit_percent: u8,
    pub active: bool,
}

pub const DEFAULT_DEPOSIT_PERCENT: u8 = 50;

fn default_deposit_percent() -> u8 {
    DEFAULT_DEPOSIT_PERCENT
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub capacity: Option<u32>,
    #[serde(default = "default_deposit_percent")]
    #[validate(range(max = 100))]
    pub deposit_percent: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub capacity: Option<u32>,
    #[validate(range(max = 100))]
    pub deposit_percent: Option<u8>,
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_deposit_defaults_to_half() {
        let payload: ResourceCreate =
            serde_json::from_value(serde_json::json!({ "name": "Quincho 1" })).unwrap();
        assert_eq!(payload.deposit_percent, DEFAULT_DEPOSIT_PERCENT);
    }

    #[test]
    fn test_resource_deposit_above_100_is_invalid() {
        let payload: ResourceCreate = serde_json::from_value(serde_json::json!({
            "name": "Salón",
            "depositPercent": 120
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }
}
