//! Catalog Repository
//!
//! Services, categories, collectors and venues share the same storage
//! shape, so the read and delete paths are generic over [`CatalogEntry`].
//! Deleting an entry that stored data still references is refused.

use redb::{TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::error::ErrorCode;
use shared::models::{
    Category, CategoryCreate, CategoryUpdate, Collector, CollectorCreate, CollectorUpdate, Member,
    Payment, Reservation, Resource, ResourceCreate, ResourceUpdate, Service, ServiceCreate,
    ServiceUpdate,
};

use super::{RepoError, RepoResult};
use crate::db::storage::{
    CATEGORIES, COLLECTORS, ClubStorage, MEMBERS, PAYMENTS, RESERVATIONS, RESOURCES, SERVICES,
    all_records, get_record, next_sequence, put_record, seq,
};

pub trait CatalogEntry: Serialize + DeserializeOwned {
    const TABLE: TableDefinition<'static, u64, &'static [u8]>;
    const SEQUENCE: &'static str;
    const NOT_FOUND: ErrorCode;
    const LABEL: &'static str;

    /// Whether stored data still references entry `id`
    fn in_use(txn: &WriteTransaction, id: u64) -> RepoResult<bool>;
}

impl CatalogEntry for Service {
    const TABLE: TableDefinition<'static, u64, &'static [u8]> = SERVICES;
    const SEQUENCE: &'static str = seq::SERVICES;
    const NOT_FOUND: ErrorCode = ErrorCode::ServiceNotFound;
    const LABEL: &'static str = "Service";

    fn in_use(txn: &WriteTransaction, id: u64) -> RepoResult<bool> {
        let members: Vec<Member> = all_records(&txn.open_table(MEMBERS)?)?;
        Ok(members.iter().any(|m| m.service_ids.contains(&id)))
    }
}

impl CatalogEntry for Category {
    const TABLE: TableDefinition<'static, u64, &'static [u8]> = CATEGORIES;
    const SEQUENCE: &'static str = seq::CATEGORIES;
    const NOT_FOUND: ErrorCode = ErrorCode::CategoryNotFound;
    const LABEL: &'static str = "Category";

    fn in_use(txn: &WriteTransaction, id: u64) -> RepoResult<bool> {
        let members: Vec<Member> = all_records(&txn.open_table(MEMBERS)?)?;
        Ok(members.iter().any(|m| m.category_id == Some(id)))
    }
}

impl CatalogEntry for Collector {
    const TABLE: TableDefinition<'static, u64, &'static [u8]> = COLLECTORS;
    const SEQUENCE: &'static str = seq::COLLECTORS;
    const NOT_FOUND: ErrorCode = ErrorCode::CollectorNotFound;
    const LABEL: &'static str = "Collector";

    fn in_use(txn: &WriteTransaction, id: u64) -> RepoResult<bool> {
        let payments: Vec<Payment> = all_records(&txn.open_table(PAYMENTS)?)?;
        Ok(payments.iter().any(|p| p.collector_id == Some(id)))
    }
}

impl CatalogEntry for Resource {
    const TABLE: TableDefinition<'static, u64, &'static [u8]> = RESOURCES;
    const SEQUENCE: &'static str = seq::RESOURCES;
    const NOT_FOUND: ErrorCode = ErrorCode::ResourceNotFound;
    const LABEL: &'static str = "Resource";

    fn in_use(txn: &WriteTransaction, id: u64) -> RepoResult<bool> {
        let reservations: Vec<Reservation> = all_records(&txn.open_table(RESERVATIONS)?)?;
        Ok(reservations.iter().any(|r| r.resource_id == id))
    }
}

// ========== Generic paths ==========

pub fn find_all<T: CatalogEntry>(storage: &ClubStorage) -> RepoResult<Vec<T>> {
    let txn = storage.begin_read()?;
    Ok(all_records(&txn.open_table(T::TABLE)?)?)
}

pub fn find_by_id<T: CatalogEntry>(storage: &ClubStorage, id: u64) -> RepoResult<T> {
    let txn = storage.begin_read()?;
    get_record(&txn.open_table(T::TABLE)?, id)?
        .ok_or_else(|| RepoError::not_found(T::NOT_FOUND, T::LABEL, id))
}

/// Fetch inside a write transaction
pub(crate) fn require<T: CatalogEntry>(txn: &WriteTransaction, id: u64) -> RepoResult<T> {
    get_record(&txn.open_table(T::TABLE)?, id)?
        .ok_or_else(|| RepoError::not_found(T::NOT_FOUND, T::LABEL, id))
}

pub fn delete<T: CatalogEntry>(storage: &ClubStorage, id: u64) -> RepoResult<()> {
    let txn = storage.begin_write()?;
    require::<T>(&txn, id)?;
    if T::in_use(&txn, id)? {
        return Err(RepoError::InvalidState(
            ErrorCode::CatalogInUse,
            format!("{} {} is still referenced and cannot be deleted", T::LABEL, id),
        ));
    }
    txn.open_table(T::TABLE)?.remove(id)?;
    txn.commit()?;

    tracing::info!(kind = T::LABEL, id, "Catalog entry deleted");
    Ok(())
}

fn insert<T: CatalogEntry>(storage: &ClubStorage, build: impl FnOnce(&WriteTransaction, u64) -> RepoResult<T>) -> RepoResult<T> {
    let txn = storage.begin_write()?;
    let id = next_sequence(&txn, T::SEQUENCE)?;
    let entry = build(&txn, id)?;
    put_record(&mut txn.open_table(T::TABLE)?, id, &entry)?;
    txn.commit()?;

    tracing::info!(kind = T::LABEL, id, "Catalog entry created");
    Ok(entry)
}

fn modify<T: CatalogEntry>(storage: &ClubStorage, id: u64, apply: impl FnOnce(&mut T)) -> RepoResult<T> {
    let txn = storage.begin_write()?;
    let entry = {
        let mut table = txn.open_table(T::TABLE)?;
        let mut entry: T = get_record(&table, id)?
            .ok_or_else(|| RepoError::not_found(T::NOT_FOUND, T::LABEL, id))?;
        apply(&mut entry);
        put_record(&mut table, id, &entry)?;
        entry
    };
    txn.commit()?;
    Ok(entry)
}

// ========== Services ==========

pub fn create_service(storage: &ClubStorage, data: ServiceCreate) -> RepoResult<Service> {
    insert(storage, |_, id| {
        Ok(Service {
            id,
            name: data.name.trim().to_string(),
            description: data.description,
            monthly_fee: data.monthly_fee,
            active: true,
        })
    })
}

pub fn update_service(storage: &ClubStorage, id: u64, data: ServiceUpdate) -> RepoResult<Service> {
    modify(storage, id, |s: &mut Service| {
        if let Some(v) = data.name {
            s.name = v.trim().to_string();
        }
        if let Some(v) = data.description {
            s.description = Some(v);
        }
        if let Some(v) = data.monthly_fee {
            s.monthly_fee = v;
        }
        if let Some(v) = data.active {
            s.active = v;
        }
    })
}

// ========== Categories ==========

pub fn create_category(storage: &ClubStorage, data: CategoryCreate) -> RepoResult<Category> {
    insert(storage, |_, id| {
        Ok(Category {
            id,
            name: data.name.trim().to_string(),
            description: data.description,
            monthly_fee: data.monthly_fee,
            active: true,
        })
    })
}

pub fn update_category(
    storage: &ClubStorage,
    id: u64,
    data: CategoryUpdate,
) -> RepoResult<Category> {
    modify(storage, id, |c: &mut Category| {
        if let Some(v) = data.name {
            c.name = v.trim().to_string();
        }
        if let Some(v) = data.description {
            c.description = Some(v);
        }
        if let Some(v) = data.monthly_fee {
            c.monthly_fee = v;
        }
        if let Some(v) = data.active {
            c.active = v;
        }
    })
}

// ========== Collectors ==========

pub fn create_collector(storage: &ClubStorage, data: CollectorCreate) -> RepoResult<Collector> {
    insert(storage, |txn, id| {
        let n = next_sequence(txn, seq::COLLECTOR_CODE)?;
        Ok(Collector {
            id,
            code: format!("COB-{:03}", n),
            name: data.name.trim().to_string(),
            phone: data.phone,
            active: true,
        })
    })
}

pub fn update_collector(
    storage: &ClubStorage,
    id: u64,
    data: CollectorUpdate,
) -> RepoResult<Collector> {
    modify(storage, id, |c: &mut Collector| {
        if let Some(v) = data.name {
            c.name = v.trim().to_string();
        }
        if let Some(v) = data.phone {
            c.phone = Some(v);
        }
        if let Some(v) = data.active {
            c.active = v;
        }
    })
}

// ========== Resources ==========

pub fn create_resource(storage: &ClubStorage, data: ResourceCreate) -> RepoResult<Resource> {
    insert(storage, |_, id| {
        Ok(Resource {
            id,
            name: data.name.trim().to_string(),
            description: data.description,
            capacity: data.capacity,
            deposit_percent: data.deposit_percent,
            active: true,
        })
    })
}

pub fn update_resource(
    storage: &ClubStorage,
    id: u64,
    data: ResourceUpdate,
) -> RepoResult<Resource> {
    modify(storage, id, |r: &mut Resource| {
        if let Some(v) = data.name {
            r.name = v.trim().to_string();
        }
        if let Some(v) = data.description {
            r.description = Some(v);
        }
        if let Some(v) = data.capacity {
            r.capacity = Some(v);
        }
        if let Some(v) = data.deposit_percent {
            r.deposit_percent = v;
        }
        if let Some(v) = data.active {
            r.active = v;
        }
    })
}
