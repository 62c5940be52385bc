//! Whole-store JSON snapshot
//!
//! Export returns every table as one document in the shape of the legacy
//! flat file. Import loads such a document into an empty store (users may
//! already exist: the seeded admin is kept and matching usernames are
//! skipped). Sequences end up past every imported id and code.

use std::collections::{BTreeMap, HashSet};

use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};
use shared::error::ErrorCode;
use shared::models::{
    Category, Collector, MAX_AMOUNT, Member, Movement, Payment, Refinancing, Reservation, ReservationPayment,
    Resource, Service,
};

use super::integrity::{self, IntegrityReport};
use super::repository::member::mint_member_code;
use super::repository::user::UserRecord;
use super::repository::{RepoError, RepoResult};
use super::storage::{
    CATEGORIES, COLLECTORS, ClubStorage, MEMBER_CODES, MEMBERS, MOVEMENTS, PAYMENTS,
    REFINANCINGS, RESERVATION_PAYMENTS, RESERVATIONS, RESOURCES, SERVICES, USERNAMES, USERS,
    ensure_sequence_at_least, next_sequence, put_child, put_record, seq,
};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSnapshot {
    pub version: u32,
    pub exported_at: i64,
    pub members: Vec<Member>,
    pub movements: Vec<Movement>,
    pub payments: Vec<Payment>,
    pub reservations: Vec<Reservation>,
    pub reservation_payments: Vec<ReservationPayment>,
    pub services: Vec<Service>,
    pub categories: Vec<Category>,
    pub collectors: Vec<Collector>,
    pub resources: Vec<Resource>,
    pub refinancings: Vec<Refinancing>,
    pub users: Vec<UserRecord>,
    pub sequences: BTreeMap<String, u64>,
}

/// Read every table through `$txn` (read or write transaction) into a
/// [`StoreSnapshot`]. Must be used in a function returning `RepoResult`.
macro_rules! load_snapshot {
    ($txn:expr) => {{
        use $crate::db::storage as s;
        use redb::ReadableTable as _;
        let txn = $txn;
        let mut sequences = ::std::collections::BTreeMap::new();
        for entry in txn.open_table(s::SEQUENCES)?.iter()? {
            let (name, value) = entry?;
            sequences.insert(name.value().to_string(), value.value());
        }
        $crate::db::snapshot::StoreSnapshot {
            version: $crate::db::snapshot::SNAPSHOT_VERSION,
            exported_at: shared::util::now_millis(),
            members: s::all_records(&txn.open_table(s::MEMBERS)?)?,
            movements: s::all_children(&txn.open_table(s::MOVEMENTS)?)?,
            payments: s::all_records(&txn.open_table(s::PAYMENTS)?)?,
            reservations: s::all_records(&txn.open_table(s::RESERVATIONS)?)?,
            reservation_payments: s::all_children(&txn.open_table(s::RESERVATION_PAYMENTS)?)?,
            services: s::all_records(&txn.open_table(s::SERVICES)?)?,
            categories: s::all_records(&txn.open_table(s::CATEGORIES)?)?,
            collectors: s::all_records(&txn.open_table(s::COLLECTORS)?)?,
            resources: s::all_records(&txn.open_table(s::RESOURCES)?)?,
            refinancings: s::all_records(&txn.open_table(s::REFINANCINGS)?)?,
            users: s::all_records(&txn.open_table(s::USERS)?)?,
            sequences,
        }
    }};
}
pub(crate) use load_snapshot;

pub fn export(storage: &ClubStorage) -> RepoResult<StoreSnapshot> {
    let txn = storage.begin_read()?;
    Ok(load_snapshot!(&txn))
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub members: usize,
    pub movements: usize,
    pub payments: usize,
    pub reservations: usize,
    pub reservation_payments: usize,
    pub catalog_entries: usize,
    pub refinancings: usize,
    pub users_imported: usize,
    pub users_skipped: usize,
    /// Members whose duplicate code was replaced, as `(id, new code)`
    pub recoded_members: Vec<(u64, String)>,
    /// Findings on the imported data; run a repair to fix them
    pub integrity: IntegrityReport,
}

/// Load a snapshot into an empty store
pub fn import(storage: &ClubStorage, snapshot: StoreSnapshot) -> RepoResult<ImportResult> {
    check_amounts(&snapshot)?;
    let txn = storage.begin_write()?;
    ensure_empty(&txn)?;

    let mut result = ImportResult::default();

    // Sequences first, so minted codes and user ids land past imported ones
    for (name, value) in &snapshot.sequences {
        ensure_sequence_at_least(&txn, name, *value)?;
    }
    for (name, floor) in integrity::sequence_floors(&snapshot) {
        ensure_sequence_at_least(&txn, name, floor)?;
    }

    {
        let mut members = txn.open_table(MEMBERS)?;
        let mut codes = txn.open_table(MEMBER_CODES)?;
        let mut seen = HashSet::new();
        for member in &snapshot.members {
            let mut member = member.clone();
            if !seen.insert(member.code.clone()) {
                member.code = mint_member_code(&txn, &codes)?;
                seen.insert(member.code.clone());
                result.recoded_members.push((member.id, member.code.clone()));
            }
            codes.insert(member.code.as_str(), member.id)?;
            put_record(&mut members, member.id, &member)?;
        }
        result.members = snapshot.members.len();
    }
    {
        let mut table = txn.open_table(MOVEMENTS)?;
        for movement in &snapshot.movements {
            put_child(&mut table, movement.member_id, movement.id, movement)?;
        }
        result.movements = snapshot.movements.len();
    }
    {
        let mut table = txn.open_table(RESERVATION_PAYMENTS)?;
        for payment in &snapshot.reservation_payments {
            put_child(&mut table, payment.reservation_id, payment.id, payment)?;
        }
        result.reservation_payments = snapshot.reservation_payments.len();
    }

    macro_rules! import_records {
        ($table:expr, $rows:expr) => {{
            let mut table = txn.open_table($table)?;
            for row in $rows {
                put_record(&mut table, row.id, row)?;
            }
            $rows.len()
        }};
    }
    result.payments = import_records!(PAYMENTS, &snapshot.payments);
    result.reservations = import_records!(RESERVATIONS, &snapshot.reservations);
    result.refinancings = import_records!(REFINANCINGS, &snapshot.refinancings);
    result.catalog_entries = import_records!(SERVICES, &snapshot.services)
        + import_records!(CATEGORIES, &snapshot.categories)
        + import_records!(COLLECTORS, &snapshot.collectors)
        + import_records!(RESOURCES, &snapshot.resources);

    {
        let mut names = txn.open_table(USERNAMES)?;
        let mut users = txn.open_table(USERS)?;
        for record in &snapshot.users {
            let key = record.user.username.trim().to_lowercase();
            if names.get(key.as_str())?.is_some() {
                result.users_skipped += 1;
                continue;
            }
            let id = next_sequence(&txn, seq::USERS)?;
            let mut record = record.clone();
            record.user.id = id;
            record.user.username = key;
            names.insert(record.user.username.as_str(), id)?;
            put_record(&mut users, id, &record)?;
            result.users_imported += 1;
        }
    }

    result.integrity = integrity::check(&load_snapshot!(&txn));
    txn.commit()?;

    tracing::info!(
        members = result.members,
        movements = result.movements,
        payments = result.payments,
        reservations = result.reservations,
        healthy = result.integrity.healthy,
        "Store imported from snapshot"
    );
    Ok(result)
}

/// Every money field must be within `0..=MAX_AMOUNT`
fn check_amounts(snapshot: &StoreSnapshot) -> RepoResult<()> {
    let movements = snapshot.movements.iter().flat_map(|m| {
        std::iter::once(("movement", m.id, m.amount))
            .chain(m.allocations.iter().map(move |a| ("movement", m.id, a.amount)))
    });
    let payments = snapshot.payments.iter().map(|p| ("payment", p.id, p.amount));
    let reservations = snapshot.reservations.iter().flat_map(|r| {
        [r.monto_total, r.pagado, r.deposito_requerido].map(|amount| ("reservation", r.id, amount))
    });
    let reservation_payments = snapshot
        .reservation_payments
        .iter()
        .map(|p| ("reservation payment", p.id, p.amount));
    let refinancings = snapshot.refinancings.iter().flat_map(|r| {
        [r.principal, r.down_payment, r.financed_amount]
            .into_iter()
            .chain(r.installments.iter().map(|i| i.amount))
            .map(move |amount| ("refinancing", r.id, amount))
    });
    let fees = snapshot
        .services
        .iter()
        .map(|s| ("service", s.id, s.monthly_fee))
        .chain(snapshot.categories.iter().map(|c| ("category", c.id, c.monthly_fee)));

    let bad = movements
        .chain(payments)
        .chain(reservations)
        .chain(reservation_payments)
        .chain(refinancings)
        .chain(fees)
        .find(|&(_, _, amount)| !(0..=MAX_AMOUNT).contains(&amount));
    match bad {
        Some((kind, id, amount)) => Err(RepoError::Validation(
            ErrorCode::ValidationFailed,
            format!("Amount {} of {} {} is out of range", amount, kind, id),
        )),
        None => Ok(()),
    }
}

fn ensure_empty(txn: &WriteTransaction) -> RepoResult<()> {
    let mut occupied = Vec::new();
    macro_rules! check {
        ($($table:ident),*) => {
            $(
                if txn.open_table($table)?.first()?.is_some() {
                    occupied.push(stringify!($table).to_lowercase());
                }
            )*
        };
    }
    check!(
        MEMBERS,
        MOVEMENTS,
        PAYMENTS,
        RESERVATIONS,
        RESERVATION_PAYMENTS,
        SERVICES,
        CATEGORIES,
        COLLECTORS,
        RESOURCES,
        REFINANCINGS
    );

    if occupied.is_empty() {
        Ok(())
    } else {
        Err(RepoError::InvalidState(
            ErrorCode::StoreNotEmpty,
            format!("Import needs an empty store; found data in: {}", occupied.join(", ")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::member::{self, test_support::*};
    use super::super::repository::{catalog, payment, user};
    use super::*;
    use shared::models::{PaymentCreate, PaymentMethod, ServiceCreate};

    fn seeded_store() -> ClubStorage {
        let storage = ClubStorage::open_in_memory().unwrap();
        user::seed_admin(&storage, "admin", "admin").unwrap();
        let ana = member::create(&storage, new_member("Ana"), today()).unwrap();
        member::create(&storage, new_member("Bruno"), today()).unwrap();
        catalog::create_service(
            &storage,
            ServiceCreate {
                name: "Tenis".to_string(),
                description: None,
                monthly_fee: 80_000,
            },
        )
        .unwrap();
        payment::create(
            &storage,
            PaymentCreate {
                member_id: ana.id,
                amount: 50_000,
                date: None,
                method: PaymentMethod::Efectivo,
                collector_id: None,
                notes: None,
                allocations: None,
            },
            "admin",
            today(),
        )
        .unwrap();
        storage
    }

    #[test]
    fn test_export_import_round_trip() {
        let source = seeded_store();
        let snapshot = export(&source).unwrap();
        assert_eq!(snapshot.members.len(), 2);
        assert_eq!(snapshot.sequences.get(seq::RECEIPT), Some(&1));

        let target = ClubStorage::open_in_memory().unwrap();
        user::seed_admin(&target, "admin", "other").unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        let result = import(&target, serde_json::from_str(&json).unwrap()).unwrap();

        assert_eq!(result.members, 2);
        assert_eq!(result.movements, 1);
        assert_eq!(result.catalog_entries, 1);
        assert_eq!(result.users_skipped, 1);
        assert!(result.integrity.healthy);

        // New records continue after the imported sequences
        let carla = member::create(&target, new_member("Carla"), today()).unwrap();
        assert_eq!(carla.id, 3);
        assert_eq!(carla.code, "S-00003");
    }

    #[test]
    fn test_import_requires_empty_store() {
        let source = seeded_store();
        let snapshot = export(&source).unwrap();
        let err = import(&source, snapshot).unwrap_err();
        assert!(matches!(err, RepoError::InvalidState(ErrorCode::StoreNotEmpty, _)));
    }

    #[test]
    fn test_import_rejects_out_of_range_amounts() {
        let source = seeded_store();
        let mut snapshot = export(&source).unwrap();
        snapshot.movements[0].amount = i64::MAX;

        let target = ClubStorage::open_in_memory().unwrap();
        let err = import(&target, snapshot).unwrap_err();
        assert!(matches!(err, RepoError::Validation(ErrorCode::ValidationFailed, _)));
        // Nothing was written
        assert!(export(&target).unwrap().members.is_empty());
    }

    #[test]
    fn test_import_recodes_duplicate_codes() {
        let source = seeded_store();
        let mut snapshot = export(&source).unwrap();
        snapshot.members[1].code = snapshot.members[0].code.clone();
        snapshot.sequences.clear();

        let target = ClubStorage::open_in_memory().unwrap();
        let result = import(&target, snapshot).unwrap();
        assert_eq!(result.recoded_members, vec![(2, "S-00002".to_string())]);
    }

    #[test]
    fn test_legacy_document_without_sequences() {
        let json = serde_json::json!({
            "members": [{
                "id": 40, "code": "S-00040", "firstName": "Luis", "lastName": "Ayala",
                "document": "998877", "email": null, "phone": null, "address": null,
                "categoryId": null, "joinedOn": "2019-03-01", "active": true,
                "notes": null, "createdAt": 0, "updatedAt": 0
            }]
        });
        let target = ClubStorage::open_in_memory().unwrap();
        let result = import(&target, serde_json::from_value(json).unwrap()).unwrap();
        assert_eq!(result.members, 1);

        let next = member::create(&target, new_member("Ana"), today()).unwrap();
        assert_eq!(next.id, 41);
        assert_eq!(next.code, "S-00041");
    }
}
