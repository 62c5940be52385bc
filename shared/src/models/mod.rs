//! Data models
//!
//! Shared between club-server and API clients.
//! All IDs are `u64` minted from store sequences; money is integer guaraníes.

pub mod catalog;
pub mod member;
pub mod movement;
pub mod payment;
pub mod refinancing;
pub mod reservation;
pub mod user;

/// Largest amount accepted in any money field (one trillion Gs). Keeps
/// ledger sums far from `i64` overflow.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

// Re-exports
pub use catalog::*;
pub use member::*;
pub use movement::*;
pub use payment::*;
pub use refinancing::*;
pub use reservation::*;
pub use user::*;
