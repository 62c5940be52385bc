//! redb-based storage for the club store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `members` | `id` | `Member` | Members |
//! | `member_codes` | `code` | `id` | Unique member code index |
//! | `users` | `id` | `UserRecord` | Back-office users |
//! | `usernames` | `username` | `id` | Unique username index |
//! | `movements` | `(member_id, id)` | `Movement` | Ledger, range-scanned per member |
//! | `payments` | `id` | `Payment` | Member payments |
//! | `reservations` | `id` | `Reservation` | Venue bookings |
//! | `reservation_payments` | `(reservation_id, id)` | `ReservationPayment` | Append-only |
//! | `services` / `categories` / `collectors` / `resources` | `id` | catalog entry | Catalog |
//! | `refinancings` | `id` | `Refinancing` | Installment plans |
//! | `sequences` | `name` | `u64` | Id and code counters |
//!
//! Every value is JSON. Sequences are only incremented inside the write
//! transaction that inserts the record they number.

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, Table, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub const MEMBERS: TableDefinition<u64, &[u8]> = TableDefinition::new("members");
pub const MEMBER_CODES: TableDefinition<&str, u64> = TableDefinition::new("member_codes");
pub const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");
pub const USERNAMES: TableDefinition<&str, u64> = TableDefinition::new("usernames");
pub const MOVEMENTS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("movements");
pub const PAYMENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("payments");
pub const RESERVATIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("reservations");
pub const RESERVATION_PAYMENTS: TableDefinition<(u64, u64), &[u8]> =
    TableDefinition::new("reservation_payments");
pub const SERVICES: TableDefinition<u64, &[u8]> = TableDefinition::new("services");
pub const CATEGORIES: TableDefinition<u64, &[u8]> = TableDefinition::new("categories");
pub const COLLECTORS: TableDefinition<u64, &[u8]> = TableDefinition::new("collectors");
pub const RESOURCES: TableDefinition<u64, &[u8]> = TableDefinition::new("resources");
pub const REFINANCINGS: TableDefinition<u64, &[u8]> = TableDefinition::new("refinancings");
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Sequence names
pub mod seq {
    pub const MEMBERS: &str = "members";
    pub const MEMBER_CODE: &str = "member_code";
    pub const USERS: &str = "users";
    pub const MOVEMENTS: &str = "movements";
    pub const PAYMENTS: &str = "payments";
    pub const RECEIPT: &str = "receipt";
    pub const RESERVATIONS: &str = "reservations";
    pub const RESERVATION_PAYMENTS: &str = "reservation_payments";
    pub const RESERVATION_RECEIPT: &str = "reservation_payment";
    pub const SERVICES: &str = "services";
    pub const CATEGORIES: &str = "categories";
    pub const COLLECTORS: &str = "collectors";
    pub const COLLECTOR_CODE: &str = "collector_code";
    pub const RESOURCES: &str = "resources";
    pub const REFINANCINGS: &str = "refinancings";
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Club store backed by redb
///
/// redb allows a single writer at a time and MVCC readers, so a
/// read-validate-write sequence inside one write transaction cannot race
/// with another request.
#[derive(Clone)]
pub struct ClubStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for ClubStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClubStorage").finish_non_exhaustive()
    }
}

impl ClubStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        init_tables(&db)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        init_tables(&db)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }
}

fn init_tables(db: &Database) -> StorageResult<()> {
    let txn = db.begin_write()?;
    {
        let _ = txn.open_table(MEMBERS)?;
        let _ = txn.open_table(MEMBER_CODES)?;
        let _ = txn.open_table(USERS)?;
        let _ = txn.open_table(USERNAMES)?;
        let _ = txn.open_table(MOVEMENTS)?;
        let _ = txn.open_table(PAYMENTS)?;
        let _ = txn.open_table(RESERVATIONS)?;
        let _ = txn.open_table(RESERVATION_PAYMENTS)?;
        let _ = txn.open_table(SERVICES)?;
        let _ = txn.open_table(CATEGORIES)?;
        let _ = txn.open_table(COLLECTORS)?;
        let _ = txn.open_table(RESOURCES)?;
        let _ = txn.open_table(REFINANCINGS)?;
        let _ = txn.open_table(SEQUENCES)?;
    }
    txn.commit()?;
    Ok(())
}

// ========== Sequences ==========

/// Increment and return the named sequence (within transaction)
pub fn next_sequence(txn: &WriteTransaction, name: &str) -> StorageResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let current = table.get(name)?.map(|guard| guard.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(name, next)?;
    Ok(next)
}

/// Current value of the named sequence
pub fn current_sequence(
    table: &impl ReadableTable<&'static str, u64>,
    name: &str,
) -> StorageResult<u64> {
    Ok(table.get(name)?.map(|guard| guard.value()).unwrap_or(0))
}

/// Raise the sequence to `value` if it is behind. Returns whether it moved.
pub fn ensure_sequence_at_least(
    txn: &WriteTransaction,
    name: &str,
    value: u64,
) -> StorageResult<bool> {
    let mut table = txn.open_table(SEQUENCES)?;
    let current = table.get(name)?.map(|guard| guard.value()).unwrap_or(0);
    if current >= value {
        return Ok(false);
    }
    table.insert(name, value)?;
    Ok(true)
}

// ========== JSON records keyed by id ==========

pub fn get_record<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> StorageResult<Option<T>> {
    match table.get(id)? {
        Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
        None => Ok(None),
    }
}

pub fn put_record<T: Serialize>(
    table: &mut Table<'_, u64, &'static [u8]>,
    id: u64,
    value: &T,
) -> StorageResult<()> {
    let bytes = serde_json::to_vec(value)?;
    table.insert(id, bytes.as_slice())?;
    Ok(())
}

/// All records in key order
pub fn all_records<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
) -> StorageResult<Vec<T>> {
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_key, value) = entry?;
        records.push(serde_json::from_slice(value.value())?);
    }
    Ok(records)
}

/// Highest id stored in the table
pub fn max_key(table: &impl ReadableTable<u64, &'static [u8]>) -> StorageResult<u64> {
    Ok(table.last()?.map(|(key, _)| key.value()).unwrap_or(0))
}

// ========== JSON records keyed by (parent_id, id) ==========

pub fn get_child<T: DeserializeOwned>(
    table: &impl ReadableTable<(u64, u64), &'static [u8]>,
    parent_id: u64,
    id: u64,
) -> StorageResult<Option<T>> {
    match table.get((parent_id, id))? {
        Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
        None => Ok(None),
    }
}

pub fn put_child<T: Serialize>(
    table: &mut Table<'_, (u64, u64), &'static [u8]>,
    parent_id: u64,
    id: u64,
    value: &T,
) -> StorageResult<()> {
    let bytes = serde_json::to_vec(value)?;
    table.insert((parent_id, id), bytes.as_slice())?;
    Ok(())
}

/// All children of one parent, ordered by id
pub fn children<T: DeserializeOwned>(
    table: &impl ReadableTable<(u64, u64), &'static [u8]>,
    parent_id: u64,
) -> StorageResult<Vec<T>> {
    let mut records = Vec::new();
    for entry in table.range((parent_id, 0u64)..=(parent_id, u64::MAX))? {
        let (_key, value) = entry?;
        records.push(serde_json::from_slice(value.value())?);
    }
    Ok(records)
}

/// Every child record across all parents
pub fn all_children<T: DeserializeOwned>(
    table: &impl ReadableTable<(u64, u64), &'static [u8]>,
) -> StorageResult<Vec<T>> {
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_key, value) = entry?;
        records.push(serde_json::from_slice(value.value())?);
    }
    Ok(records)
}

/// Highest child id across all parents
pub fn max_child_id(
    table: &impl ReadableTable<(u64, u64), &'static [u8]>,
) -> StorageResult<u64> {
    let mut max = 0;
    for entry in table.iter()? {
        let (key, _value) = entry?;
        max = max.max(key.value().1);
    }
    Ok(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        name: String,
    }

    fn row(name: &str) -> Row {
        Row {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_sequence_increment() {
        let storage = ClubStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        assert_eq!(next_sequence(&txn, seq::MEMBERS).unwrap(), 1);
        assert_eq!(next_sequence(&txn, seq::MEMBERS).unwrap(), 2);
        assert_eq!(next_sequence(&txn, seq::PAYMENTS).unwrap(), 1);
        txn.commit().unwrap();

        let read = storage.begin_read().unwrap();
        let table = read.open_table(SEQUENCES).unwrap();
        assert_eq!(current_sequence(&table, seq::MEMBERS).unwrap(), 2);
        assert_eq!(current_sequence(&table, seq::RESERVATIONS).unwrap(), 0);
    }

    #[test]
    fn test_aborted_transaction_does_not_advance_sequence() {
        let storage = ClubStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        next_sequence(&txn, seq::MEMBERS).unwrap();
        txn.abort().unwrap();

        let txn = storage.begin_write().unwrap();
        assert_eq!(next_sequence(&txn, seq::MEMBERS).unwrap(), 1);
    }

    #[test]
    fn test_ensure_sequence_at_least() {
        let storage = ClubStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        assert!(ensure_sequence_at_least(&txn, seq::USERS, 5).unwrap());
        assert!(!ensure_sequence_at_least(&txn, seq::USERS, 3).unwrap());
        assert_eq!(next_sequence(&txn, seq::USERS).unwrap(), 6);
    }

    #[test]
    fn test_record_round_trip() {
        let storage = ClubStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        {
            let mut table = txn.open_table(SERVICES).unwrap();
            put_record(&mut table, 2, &row("pileta")).unwrap();
            put_record(&mut table, 1, &row("tenis")).unwrap();
        }
        txn.commit().unwrap();

        let read = storage.begin_read().unwrap();
        let table = read.open_table(SERVICES).unwrap();
        assert_eq!(get_record::<Row>(&table, 2).unwrap(), Some(row("pileta")));
        assert_eq!(get_record::<Row>(&table, 9).unwrap(), None);
        let all: Vec<Row> = all_records(&table).unwrap();
        assert_eq!(all, vec![row("tenis"), row("pileta")]);
        assert_eq!(max_key(&table).unwrap(), 2);
    }

    #[test]
    fn test_children_are_scoped_to_parent() {
        let storage = ClubStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        {
            let mut table = txn.open_table(MOVEMENTS).unwrap();
            put_child(&mut table, 1, 10, &row("a")).unwrap();
            put_child(&mut table, 2, 11, &row("b")).unwrap();
            put_child(&mut table, 1, 12, &row("c")).unwrap();
        }
        txn.commit().unwrap();

        let read = storage.begin_read().unwrap();
        let table = read.open_table(MOVEMENTS).unwrap();
        let first: Vec<Row> = children(&table, 1).unwrap();
        assert_eq!(first, vec![row("a"), row("c")]);
        assert_eq!(get_child::<Row>(&table, 2, 11).unwrap(), Some(row("b")));
        assert_eq!(get_child::<Row>(&table, 1, 11).unwrap(), None);
        assert_eq!(all_children::<Row>(&table).unwrap().len(), 3);
        assert_eq!(max_child_id(&table).unwrap(), 12);
    }
}
