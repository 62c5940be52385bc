//! Unified error codes for the club backend
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Catalog errors (services, categories, collectors, venues)
//! - 4xxx: Member and ledger errors
//! - 5xxx: Payment errors
//! - 6xxx: Reservation errors
//! - 7xxx: Refinancing errors
//! - 8xxx: User errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Import requires an empty store
    StoreNotEmpty = 9,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (username/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1007,
    /// Cron bearer secret missing or wrong
    CronSecretInvalid = 1008,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2003,
    /// Cron endpoint is not configured
    CronDisabled = 2007,

    // ==================== 3xxx: Catalog ====================
    /// Service not found
    ServiceNotFound = 3001,
    /// Member category not found
    CategoryNotFound = 3101,
    /// Collector not found
    CollectorNotFound = 3201,
    /// Venue not found
    ResourceNotFound = 3301,
    /// Venue is inactive
    ResourceInactive = 3302,
    /// Catalog entry is still referenced
    CatalogInUse = 3901,

    // ==================== 4xxx: Member / Ledger ====================
    /// Member not found
    MemberNotFound = 4001,
    /// Member code already exists
    MemberCodeExists = 4002,
    /// Member still has ledger movements
    MemberHasMovements = 4003,
    /// Movement not found
    MovementNotFound = 4101,
    /// Allocation references an invalid debit
    AllocationInvalid = 4102,
    /// Allocations exceed the credit amount
    AllocationExceedsCredit = 4103,
    /// Allocations exceed the debit's outstanding balance
    AllocationExceedsOutstanding = 4104,
    /// Debit is referenced by an allocation
    MovementReferenced = 4105,
    /// Credit belongs to a payment
    MovementLinkedToPayment = 4106,
    /// Charge period is invalid
    ChargePeriodInvalid = 4201,

    // ==================== 5xxx: Payment ====================
    /// Payment not found
    PaymentNotFound = 5001,
    /// Payment amount must be positive
    PaymentInvalidAmount = 5002,
    /// Invalid payment method
    PaymentInvalidMethod = 5003,

    // ==================== 6xxx: Reservation ====================
    /// Reservation not found
    ReservationNotFound = 6001,
    /// Reservation overlaps another booking of the venue
    ReservationOverlap = 6002,
    /// Status transition not allowed
    ReservationInvalidTransition = 6003,
    /// Reservation start/end are invalid
    ReservationInvalidPeriod = 6004,

    // ==================== 7xxx: Refinancing ====================
    /// Refinancing not found
    RefinancingNotFound = 7001,
    /// Refinancing terms are invalid
    RefinancingInvalidTerms = 7002,
    /// Installment not found
    InstallmentNotFound = 7003,
    /// Installment already paid
    InstallmentAlreadyPaid = 7004,
    /// Refinancing is no longer active
    RefinancingClosed = 7005,

    // ==================== 8xxx: User ====================
    /// User not found
    UserNotFound = 8001,
    /// Username already exists
    UsernameExists = 8002,
    /// Cannot delete self
    UserCannotDeleteSelf = 8003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,
    /// Storage corrupted (data file damaged)
    StorageCorrupted = 9403,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::StoreNotEmpty => "Import requires an empty store",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid username or password",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::AccountDisabled => "Account is disabled",
            ErrorCode::CronSecretInvalid => "Invalid cron secret",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Administrator role is required",
            ErrorCode::CronDisabled => "Cron endpoint is not configured",

            // Catalog
            ErrorCode::ServiceNotFound => "Service not found",
            ErrorCode::CategoryNotFound => "Category not found",
            ErrorCode::CollectorNotFound => "Collector not found",
            ErrorCode::ResourceNotFound => "Venue not found",
            ErrorCode::ResourceInactive => "Venue is inactive",
            ErrorCode::CatalogInUse => "Entry is still referenced",

            // Member / Ledger
            ErrorCode::MemberNotFound => "Member not found",
            ErrorCode::MemberCodeExists => "Member code already exists",
            ErrorCode::MemberHasMovements => "Member has ledger movements",
            ErrorCode::MovementNotFound => "Movement not found",
            ErrorCode::AllocationInvalid => "Allocation references an invalid debit",
            ErrorCode::AllocationExceedsCredit => "Allocations exceed the credit amount",
            ErrorCode::AllocationExceedsOutstanding => {
                "Allocations exceed the debit's outstanding balance"
            }
            ErrorCode::MovementReferenced => "Debit is referenced by a payment allocation",
            ErrorCode::MovementLinkedToPayment => "Credit belongs to a payment",
            ErrorCode::ChargePeriodInvalid => "Charge period must be YYYY-MM",

            // Payment
            ErrorCode::PaymentNotFound => "Payment not found",
            ErrorCode::PaymentInvalidAmount => "Payment amount must be positive",
            ErrorCode::PaymentInvalidMethod => "Invalid payment method",

            // Reservation
            ErrorCode::ReservationNotFound => "Reservation not found",
            ErrorCode::ReservationOverlap => "Venue is already booked for that period",
            ErrorCode::ReservationInvalidTransition => "Reservation status change not allowed",
            ErrorCode::ReservationInvalidPeriod => "Reservation end must be after start",

            // Refinancing
            ErrorCode::RefinancingNotFound => "Refinancing not found",
            ErrorCode::RefinancingInvalidTerms => "Refinancing terms are invalid",
            ErrorCode::InstallmentNotFound => "Installment not found",
            ErrorCode::InstallmentAlreadyPaid => "Installment already paid",
            ErrorCode::RefinancingClosed => "Refinancing is no longer active",

            // User
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::UsernameExists => "Username already exists",
            ErrorCode::UserCannotDeleteSelf => "Cannot delete your own account",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::StorageCorrupted => "Stored data is corrupted",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => ErrorCode::Success,
            1 => ErrorCode::Unknown,
            2 => ErrorCode::ValidationFailed,
            3 => ErrorCode::NotFound,
            4 => ErrorCode::AlreadyExists,
            5 => ErrorCode::InvalidRequest,
            6 => ErrorCode::InvalidFormat,
            7 => ErrorCode::RequiredField,
            8 => ErrorCode::ValueOutOfRange,
            9 => ErrorCode::StoreNotEmpty,

            1001 => ErrorCode::NotAuthenticated,
            1002 => ErrorCode::InvalidCredentials,
            1003 => ErrorCode::TokenExpired,
            1004 => ErrorCode::TokenInvalid,
            1007 => ErrorCode::AccountDisabled,
            1008 => ErrorCode::CronSecretInvalid,

            2001 => ErrorCode::PermissionDenied,
            2003 => ErrorCode::AdminRequired,
            2007 => ErrorCode::CronDisabled,

            3001 => ErrorCode::ServiceNotFound,
            3101 => ErrorCode::CategoryNotFound,
            3201 => ErrorCode::CollectorNotFound,
            3301 => ErrorCode::ResourceNotFound,
            3302 => ErrorCode::ResourceInactive,
            3901 => ErrorCode::CatalogInUse,

            4001 => ErrorCode::MemberNotFound,
            4002 => ErrorCode::MemberCodeExists,
            4003 => ErrorCode::MemberHasMovements,
            4101 => ErrorCode::MovementNotFound,
            4102 => ErrorCode::AllocationInvalid,
            4103 => ErrorCode::AllocationExceedsCredit,
            4104 => ErrorCode::AllocationExceedsOutstanding,
            4105 => ErrorCode::MovementReferenced,
            4106 => ErrorCode::MovementLinkedToPayment,
            4201 => ErrorCode::ChargePeriodInvalid,

            5001 => ErrorCode::PaymentNotFound,
            5002 => ErrorCode::PaymentInvalidAmount,
            5003 => ErrorCode::PaymentInvalidMethod,

            6001 => ErrorCode::ReservationNotFound,
            6002 => ErrorCode::ReservationOverlap,
            6003 => ErrorCode::ReservationInvalidTransition,
            6004 => ErrorCode::ReservationInvalidPeriod,

            7001 => ErrorCode::RefinancingNotFound,
            7002 => ErrorCode::RefinancingInvalidTerms,
            7003 => ErrorCode::InstallmentNotFound,
            7004 => ErrorCode::InstallmentAlreadyPaid,
            7005 => ErrorCode::RefinancingClosed,

            8001 => ErrorCode::UserNotFound,
            8002 => ErrorCode::UsernameExists,
            8003 => ErrorCode::UserCannotDeleteSelf,

            9001 => ErrorCode::InternalError,
            9002 => ErrorCode::DatabaseError,
            9005 => ErrorCode::ConfigError,
            9403 => ErrorCode::StorageCorrupted,

            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
