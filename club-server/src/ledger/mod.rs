//! Member ledger
//!
//! Pure functions over a member's movements. Repositories load the
//! movements inside a transaction, call into this module, and write the
//! result back in the same transaction.

pub mod allocation;
pub mod charges;
pub mod status;

pub use allocation::{
    AllocationError, allocated_by_debit, auto_allocate, outstanding_by_debit,
    validate_allocations,
};
pub use charges::{ChargePlan, PlannedCharge, charge_due_date, plan_charges};
pub use status::{compute_balance, derive_status};
