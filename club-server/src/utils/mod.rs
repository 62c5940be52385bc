//! Utility module
//!
//! # Contents
//!
//! - [`AppError`] / [`AppResult`] - application error types (from shared::error)
//! - [`time`] - business timezone and calendar helpers
//! - [`logger`] - tracing subscriber setup

pub mod logger;
pub mod time;

pub use shared::error::{AppError, AppResult, ErrorBody, ErrorCategory, ErrorCode};
