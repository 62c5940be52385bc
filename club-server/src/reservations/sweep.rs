//! Reservation expiry sweep
//!
//! ACTIVO reservations whose `end` has passed become CULMINADO. The sweep is
//! triggered by an authenticated request, by the cron endpoint, and by
//! [`ExpirySweeper`] on a fixed interval. Every run is one write
//! transaction, so overlapping runs never double-count.

use std::time::Duration;

use shared::models::{Reservation, ReservationStatus};
use tokio_util::sync::CancellationToken;

use crate::core::ServerState;
use crate::db::repository::reservation;

/// Whether the sweep would close this reservation at `now`
pub fn is_expired(reservation: &Reservation, now: i64) -> bool {
    reservation.status == ReservationStatus::Activo && reservation.end <= now
}

/// Close the reservation if it has expired. Only `status` and `updatedAt`
/// change.
pub fn expire(reservation: &mut Reservation, now: i64) -> bool {
    if !is_expired(reservation, now) {
        return false;
    }
    reservation.status = ReservationStatus::Culminado;
    reservation.updated_at = now;
    true
}

/// Periodic expiry sweep
///
/// Registered as `TaskKind::Periodic` in `start_background_tasks()`.
pub struct ExpirySweeper {
    state: ServerState,
    shutdown: CancellationToken,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(state: ServerState, shutdown: CancellationToken) -> Self {
        let interval = Duration::from_secs(state.config.sweep_interval_secs.max(1));
        Self {
            state,
            shutdown,
            interval,
        }
    }

    /// Main loop: sweep on start, then every interval until shutdown
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Reservation expiry sweeper started"
        );

        loop {
            self.sweep_once();

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Reservation expiry sweeper received shutdown signal");
                    return;
                }
            }
        }
    }

    fn sweep_once(&self) {
        match reservation::expire_due(&self.state.storage, shared::util::now_millis()) {
            Ok(result) if result.updated == 0 => {
                tracing::debug!("No expired reservations");
            }
            Ok(result) => {
                tracing::info!(
                    updated = result.updated,
                    ids = ?result.ids,
                    source = "scheduler",
                    "Reservations closed by expiry sweep"
                );
            }
            Err(e) => {
                tracing::error!("Reservation expiry sweep failed: {}", e);
            }
        }
    }
}
