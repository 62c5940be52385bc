//! Repository Module
//!
//! One module per aggregate. Every public function opens exactly one redb
//! transaction: reads, validation and writes happen inside it, and nothing
//! is written unless the whole operation succeeds.

// Members and ledger
pub mod member;
pub mod movement;
pub mod payment;

// Bookings
pub mod reservation;

// Plans
pub mod refinancing;

// Catalog
pub mod catalog;

// Auth
pub mod user;

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use super::storage::StorageError;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {1}")]
    NotFound(ErrorCode, String),

    #[error("Duplicate: {1}")]
    Duplicate(ErrorCode, String),

    #[error("Validation error: {1}")]
    Validation(ErrorCode, String),

    #[error("Invalid state: {1}")]
    InvalidState(ErrorCode, String),

    /// A domain rule rejected the write
    #[error("{0}")]
    Rule(AppError),

    #[error("Database error: {0}")]
    Database(String),
}

impl RepoError {
    pub fn not_found(code: ErrorCode, what: &str, id: u64) -> Self {
        RepoError::NotFound(code, format!("{} {} not found", what, id))
    }
}

impl From<StorageError> for RepoError {
    fn from(err: StorageError) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<AppError> for RepoError {
    fn from(err: AppError) -> Self {
        RepoError::Rule(err)
    }
}

macro_rules! impl_from_redb {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for RepoError {
                fn from(err: $err) -> Self {
                    RepoError::Database(err.to_string())
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
    serde_json::Error,
);

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(code, msg)
            | RepoError::Duplicate(code, msg)
            | RepoError::Validation(code, msg)
            | RepoError::InvalidState(code, msg) => AppError::with_message(code, msg),
            RepoError::Rule(err) => err,
            RepoError::Database(msg) => AppError::database(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
