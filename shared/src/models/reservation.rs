//! Venue reservation model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::payment::PaymentMethod;

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Hold,
    Confirmed,
    Activo,
    Culminado,
    Cancelado,
}

impl ReservationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Culminado | Self::Cancelado)
    }

    /// Whether the reservation still occupies its venue
    pub fn blocks_venue(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Hold => "HOLD",
            Self::Confirmed => "CONFIRMED",
            Self::Activo => "ACTIVO",
            Self::Culminado => "CULMINADO",
            Self::Cancelado => "CANCELADO",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document approval (APA) state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApaStatus {
    Pendiente,
    Aprobado,
    Rechazado,
}

/// Venue booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: u64,
    pub resource_id: u64,
    pub member_id: u64,
    /// Unix millis
    pub start: i64,
    /// Unix millis
    pub end: i64,
    pub status: ReservationStatus,
    pub monto_total: i64,
    /// Sum of the reservation's payments
    pub pagado: i64,
    pub deposito_requerido: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apa_estado: Option<ApaStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apa_comprobante: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apa_fecha_revision: Option<i64>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Reservation {
    /// Half-open interval overlap on `[start, end)`
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        self.start < end && start < self.end
    }
}

/// Create reservation payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReservationCreate {
    pub resource_id: u64,
    pub member_id: u64,
    pub start: i64,
    pub end: i64,
    #[validate(range(min = 0_i64, max = 1_000_000_000_000_i64))]
    pub monto_total: i64,
    /// Defaults to the venue's deposit percent of `montoTotal`
    #[validate(range(min = 0_i64, max = 1_000_000_000_000_i64))]
    pub deposito_requerido: Option<i64>,
    /// Book as HOLD instead of PENDING
    #[serde(default)]
    pub hold: bool,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// `PATCH /api/reservations/{id}/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationStatusUpdate {
    pub status: ReservationStatus,
}

/// `PATCH /api/reservations/{id}/apa`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApaUpdate {
    pub apa_estado: ApaStatus,
    /// Document reference, stored as given
    #[validate(length(max = 500))]
    pub apa_comprobante: Option<String>,
}

/// Append-only payment against a reservation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPayment {
    pub id: u64,
    pub reservation_id: u64,
    /// `RP-000001`
    pub receipt: String,
    pub amount: i64,
    pub method: PaymentMethod,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPaymentCreate {
    #[validate(range(min = 1_i64, max = 1_000_000_000_000_i64))]
    pub amount: i64,
    pub method: PaymentMethod,
    pub date: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Result of ingesting one reservation payment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPaymentResult {
    pub payment: ReservationPayment,
    pub reservation: Reservation,
}

/// `GET /api/reservations` filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationQuery {
    pub status: Option<ReservationStatus>,
    pub resource_id: Option<u64>,
    pub member_id: Option<u64>,
}

/// Outcome of an expiry sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpireResult {
    pub updated: usize,
    pub ids: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_wire_names() {
        let reservation = Reservation {
            id: 1,
            resource_id: 2,
            member_id: 3,
            start: 1_000,
            end: 2_000,
            status: ReservationStatus::Hold,
            monto_total: 500_000,
            pagado: 0,
            deposito_requerido: 250_000,
            apa_estado: Some(ApaStatus::Pendiente),
            apa_comprobante: None,
            apa_fecha_revision: None,
            notes: None,
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_value(&reservation).unwrap();
        assert_eq!(json["status"], "HOLD");
        assert_eq!(json["montoTotal"], 500_000);
        assert_eq!(json["depositoRequerido"], 250_000);
        assert_eq!(json["apaEstado"], "PENDIENTE");
        assert!(json.get("apaComprobante").is_none());
    }

    #[test]
    fn test_payment_amount_is_capped() {
        let mut payload = ReservationPaymentCreate {
            amount: 1,
            method: PaymentMethod::Efectivo,
            date: None,
            notes: None,
        };
        assert!(payload.validate().is_ok());
        payload.amount = crate::models::MAX_AMOUNT + 1;
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_overlap_is_half_open() {
        let reservation = Reservation {
            id: 1,
            resource_id: 1,
            member_id: 1,
            start: 100,
            end: 200,
            status: ReservationStatus::Confirmed,
            monto_total: 0,
            pagado: 0,
            deposito_requerido: 0,
            apa_estado: None,
            apa_comprobante: None,
            apa_fecha_revision: None,
            notes: None,
            created_at: 0,
            updated_at: 0,
        };
        assert!(reservation.overlaps(150, 250));
        assert!(reservation.overlaps(50, 101));
        assert!(!reservation.overlaps(200, 300));
        assert!(!reservation.overlaps(0, 100));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ReservationStatus::Culminado.is_terminal());
        assert!(ReservationStatus::Cancelado.is_terminal());
        assert!(ReservationStatus::Activo.blocks_venue());
    }
}
