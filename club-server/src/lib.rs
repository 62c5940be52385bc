//! Garden Club Paraguayo - club administration backend
//!
//! Members and their ledger, payments with debt allocation, monthly charge
//! runs, venue reservations with deposits, refinancing plans and the
//! back-office users that operate them.
//!
//! # Module layout
//!
//! ```text
//! club-server/src/
//! ├── core/          # configuration, state, server, background tasks
//! ├── auth/          # JWT, argon2 passwords, permissions, middleware
//! ├── api/           # HTTP routers and handlers
//! ├── db/            # redb storage, repositories, integrity, snapshots
//! ├── ledger/        # allocation, status derivation, charge planning
//! ├── reservations/  # lifecycle, deposit payments, expiry sweep
//! ├── refinancing/   # schedule calculator and plan transitions
//! └── utils/         # logging, time helpers
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod ledger;
pub mod refinancing;
pub mod reservations;
pub mod utils;

pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use db::ClubStorage;
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ErrorBody, ErrorCategory, ErrorCode};

pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// Load `.env`, create the work directory and start logging
///
/// `LOG_LEVEL` sets the filter; `LOG_DIR`, when it names an existing
/// directory, adds a daily-rolling log file.
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into());
    std::fs::create_dir_all(&work_dir)?;

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   ______               __
  / ____/___ __________/ /__  ____
 / / __/ __ `/ ___/ __  / _ \/ __ \
/ /_/ / /_/ / /  / /_/ /  __/ / / /
\____/\__,_/_/   \__,_/\___/_/ /_/
   ________      __       ____
  / ____/ /_  __/ /_     / __ \__  __
 / /   / / / / / __ \   / /_/ / / / /
/ /___/ / /_/ / /_/ /  / ____/ /_/ /
\____/_/\__,_/_.___/  /_/    \__, /
                            /____/
    "#
    );
}
