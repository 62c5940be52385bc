//! Database Module
//!
//! Embedded redb store plus the repositories that run one transaction per
//! operation.

pub mod integrity;
pub mod repository;
pub mod snapshot;
pub mod storage;

pub use storage::{ClubStorage, StorageError, StorageResult};
