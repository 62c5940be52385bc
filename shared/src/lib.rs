//! Shared types for the club backend
//!
//! Domain models exchanged over the HTTP API and the unified error system.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};
