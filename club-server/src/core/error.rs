//! Startup and server errors
//!
//! Request handlers use [`AppError`](shared::error::AppError); this type
//! covers failures before or around serving requests.

use thiserror::Error;

use crate::db::StorageError;
use crate::db::repository::RepoError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
