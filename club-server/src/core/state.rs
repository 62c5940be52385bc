use std::sync::Arc;

use chrono::NaiveDate;

use crate::auth::JwtService;
use crate::core::Config;
use crate::core::error::Result;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::db::repository::user;
use crate::db::{ClubStorage, integrity};
use crate::reservations::ExpirySweeper;
use crate::utils::time;

/// Server state shared by every handler
///
/// Cloning is cheap: the storage and the JWT service sit behind `Arc`s.
///
/// | Field | Type | Meaning |
/// |-------|------|---------|
/// | config | Config | configuration (immutable) |
/// | storage | ClubStorage | redb store |
/// | jwt_service | Arc<JwtService> | token issue and validation |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub storage: ClubStorage,
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    pub fn new(config: Config, storage: ClubStorage, jwt_service: Arc<JwtService>) -> Self {
        Self {
            config,
            storage,
            jwt_service,
        }
    }

    /// Open the store under `WORK_DIR/database` and seed the first admin
    ///
    /// The admin from `ADMIN_USERNAME` / `ADMIN_PASSWORD` is only created
    /// while the user table is empty.
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(config.database_dir())?;
        let db_path = config.database_path();
        let storage = ClubStorage::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "Database opened");

        user::seed_admin(&storage, &config.admin_username, &config.admin_password)?;

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        Ok(Self::new(config.clone(), storage, jwt_service))
    }

    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// Today's date in the configured business timezone
    pub fn today(&self) -> NaiveDate {
        time::today(self.config.timezone)
    }

    /// Register the background tasks
    ///
    /// - startup integrity report (Warmup)
    /// - reservation expiry sweep (Periodic)
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let storage = self.storage.clone();
        tasks.spawn("integrity_report", TaskKind::Warmup, async move {
            match integrity::inspect(&storage) {
                Ok(report) if report.healthy => tracing::info!("Store integrity check passed"),
                Ok(report) => tracing::warn!(
                    orphaned_allocations = report.orphaned_allocations.len(),
                    over_allocated_credits = report.over_allocated_credits.len(),
                    over_allocated_debits = report.over_allocated_debits.len(),
                    duplicate_member_codes = report.duplicate_member_codes.len(),
                    pagado_mismatches = report.pagado_mismatches.len(),
                    lagging_sequences = report.lagging_sequences.len(),
                    "Store integrity problems found, run POST /api/maintenance/repair"
                ),
                Err(e) => tracing::error!(error = %e, "Store integrity check failed"),
            }
        });

        let sweeper = ExpirySweeper::new(self.clone(), tasks.shutdown_token());
        tasks.spawn("reservation_expiry", TaskKind::Periodic, sweeper.run());

        tasks.log_summary();
        tasks
    }
}
