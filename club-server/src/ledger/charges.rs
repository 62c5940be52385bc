//! Monthly charge planning
//!
//! Each active member owes the category fee plus one fee per subscribed
//! active service. A charge is identified by `(member, period, source)` and
//! is never planned twice.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use shared::models::{Category, Member, Movement, Service};

/// Source key of a category fee charge
pub fn category_source(category_id: u64) -> String {
    format!("category:{category_id}")
}

/// Source key of a service fee charge
pub fn service_source(service_id: u64) -> String {
    format!("service:{service_id}")
}

/// DEBIT to be written by a charge run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCharge {
    pub member_id: u64,
    pub amount: i64,
    pub concept: String,
    pub source: String,
}

#[derive(Debug, Default)]
pub struct ChargePlan {
    pub charges: Vec<PlannedCharge>,
    pub skipped: usize,
}

/// Plan the charges for `period`.
///
/// `existing` holds the movements already stored for the members involved;
/// any DEBIT with the same period and source suppresses the new charge.
pub fn plan_charges(
    period: &str,
    members: &[Member],
    categories: &HashMap<u64, Category>,
    services: &HashMap<u64, Service>,
    existing: &[Movement],
) -> ChargePlan {
    let already: HashSet<(u64, &str)> = existing
        .iter()
        .filter(|m| m.is_debit() && m.period.as_deref() == Some(period))
        .filter_map(|m| m.source.as_deref().map(|source| (m.member_id, source)))
        .collect();

    let mut plan = ChargePlan::default();
    for member in members.iter().filter(|m| m.active) {
        let mut wanted = Vec::new();

        if let Some(category) = member.category_id.and_then(|id| categories.get(&id))
            && category.active
            && category.monthly_fee > 0
        {
            wanted.push((
                category_source(category.id),
                category.monthly_fee,
                format!("Cuota social {} {}", category.name, period),
            ));
        }

        for service in member.service_ids.iter().filter_map(|id| services.get(id)) {
            if service.active && service.monthly_fee > 0 {
                wanted.push((
                    service_source(service.id),
                    service.monthly_fee,
                    format!("{} {}", service.name, period),
                ));
            }
        }

        for (source, amount, concept) in wanted {
            if already.contains(&(member.id, source.as_str())) {
                plan.skipped += 1;
                continue;
            }
            plan.charges.push(PlannedCharge {
                member_id: member.id,
                amount,
                concept,
                source,
            });
        }
    }
    plan
}

/// Due date of a charge for the given period
pub fn charge_due_date(year: i32, month: u32, due_day: u32) -> Option<NaiveDate> {
    crate::utils::time::clamped_date(year, month, due_day)
}
