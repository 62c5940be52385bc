//! Venue reservations
//!
//! Pure lifecycle rules. Persistence lives in
//! [`crate::db::repository::reservation`].

pub mod lifecycle;
pub mod payments;
pub mod sweep;

pub use lifecycle::{can_transition, default_deposit, find_conflict, initial_status, transition};
pub use payments::apply_payments;
pub use sweep::{ExpirySweeper, expire, is_expired};
