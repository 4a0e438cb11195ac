//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Scheduling errors (appointments, barbers, clients, services, blocks)
//! - 5xxx: Commission errors
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
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1007,
    /// Email is already registered
    EmailAlreadyRegistered = 1008,
    /// Google login is not configured on this server
    GoogleLoginDisabled = 1009,
    /// Google credential rejected
    GoogleTokenInvalid = 1010,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 4xxx: Scheduling ====================
    /// Appointment not found
    AppointmentNotFound = 4001,
    /// Requested interval overlaps an active booking or block
    SlotUnavailable = 4002,
    /// Lifecycle transition not allowed from the current status
    InvalidTransition = 4003,
    /// None of the appointment's services can be paused
    PauseNotSupported = 4004,
    /// Too close to the start time to cancel or reschedule
    CancellationWindowClosed = 4005,
    /// Appointment changed concurrently
    AppointmentModified = 4006,
    /// Barber not found
    BarberNotFound = 4101,
    /// Barber is not taking bookings
    BarberUnavailable = 4102,
    /// Client not found
    ClientNotFound = 4201,
    /// Service not found
    ServiceNotFound = 4301,
    /// Service is inactive
    ServiceInactive = 4302,
    /// Barber block not found
    BlockNotFound = 4401,

    // ==================== 5xxx: Commission ====================
    /// Commission already recorded for the appointment
    CommissionAlreadyExists = 5002,
    /// Appointment must be completed first
    AppointmentNotCompleted = 5003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Upstream network error
    NetworkError = 9101,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Token has expired",
            ErrorCode::TokenInvalid => "Token is invalid",
            ErrorCode::AccountDisabled => "Account is disabled",
            ErrorCode::EmailAlreadyRegistered => "Email is already registered",
            ErrorCode::GoogleLoginDisabled => "Google login is not configured",
            ErrorCode::GoogleTokenInvalid => "Google credential is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",

            // Scheduling
            ErrorCode::AppointmentNotFound => "Appointment not found",
            ErrorCode::SlotUnavailable => "Time slot not available",
            ErrorCode::InvalidTransition => "Invalid status transition",
            ErrorCode::PauseNotSupported => "Service does not support pausing",
            ErrorCode::CancellationWindowClosed => "Too late to change this appointment",
            ErrorCode::AppointmentModified => "Appointment was modified concurrently",
            ErrorCode::BarberNotFound => "Barber not found",
            ErrorCode::BarberUnavailable => "Barber is not available for bookings",
            ErrorCode::ClientNotFound => "Client not found",
            ErrorCode::ServiceNotFound => "Service not found",
            ErrorCode::ServiceInactive => "Service is inactive",
            ErrorCode::BlockNotFound => "Barber block not found",

            // Commission
            ErrorCode::CommissionAlreadyExists => "Commission already exists for this appointment",
            ErrorCode::AppointmentNotCompleted => "Appointment must be completed",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Upstream service unavailable",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
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
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1007 => Ok(ErrorCode::AccountDisabled),
            1008 => Ok(ErrorCode::EmailAlreadyRegistered),
            1009 => Ok(ErrorCode::GoogleLoginDisabled),
            1010 => Ok(ErrorCode::GoogleTokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),

            // Scheduling
            4001 => Ok(ErrorCode::AppointmentNotFound),
            4002 => Ok(ErrorCode::SlotUnavailable),
            4003 => Ok(ErrorCode::InvalidTransition),
            4004 => Ok(ErrorCode::PauseNotSupported),
            4005 => Ok(ErrorCode::CancellationWindowClosed),
            4006 => Ok(ErrorCode::AppointmentModified),
            4101 => Ok(ErrorCode::BarberNotFound),
            4102 => Ok(ErrorCode::BarberUnavailable),
            4201 => Ok(ErrorCode::ClientNotFound),
            4301 => Ok(ErrorCode::ServiceNotFound),
            4302 => Ok(ErrorCode::ServiceInactive),
            4401 => Ok(ErrorCode::BlockNotFound),

            // Commission
            5002 => Ok(ErrorCode::CommissionAlreadyExists),
            5003 => Ok(ErrorCode::AppointmentNotCompleted),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9101 => Ok(ErrorCode::NetworkError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
