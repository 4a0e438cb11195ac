//! Appointment Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Appointment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Paused,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}

/// Statuses that occupy the barber's calendar.
///
/// `Paused` is deliberately absent: a paused service frees the slot.
pub const BLOCKING_STATUSES: [AppointmentStatus; 3] = [
    AppointmentStatus::Pending,
    AppointmentStatus::Confirmed,
    AppointmentStatus::InProgress,
];

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 8] = [
        Self::Pending,
        Self::Confirmed,
        Self::InProgress,
        Self::Paused,
        Self::Completed,
        Self::Cancelled,
        Self::NoShow,
        Self::Rescheduled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
            Self::Rescheduled => "rescheduled",
        }
    }

    /// Occupies the barber's calendar
    pub fn blocks_calendar(&self) -> bool {
        BLOCKING_STATUSES.contains(self)
    }

    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Cancelled | Self::NoShow | Self::Rescheduled
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    /// Accepts `in_progress`, `IN_PROGRESS` and `in-progress`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                format!("Invalid status: {s}. Valid statuses: {}", valid.join(", "))
            })
    }
}

/// Booking kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum AppointmentType {
    #[default]
    Regular,
    WalkIn,
    Emergency,
    FollowUp,
}

/// Service snapshot taken at booking time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct AppointmentService {
    pub appointment_id: i64,
    pub service_id: i64,
    pub name: String,
    pub price: f64,
    pub duration_minutes: i64,
    pub supports_pause: bool,
}

/// Appointment (one booking)
///
/// All timestamps are Unix millis. `end_at` is `start_at + duration` until
/// completion fixes it to the actual finish time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Appointment {
    pub id: i64,
    /// Public 8-character booking code
    pub code: String,
    pub client_id: i64,
    pub barber_id: i64,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub start_at: i64,
    pub end_at: i64,
    pub duration_minutes: i64,
    pub total_amount: f64,
    pub discount_amount: f64,
    pub final_amount: f64,
    pub client_notes: Option<String>,
    pub barber_notes: Option<String>,

    // -- Service session --
    pub started_at: Option<i64>,
    pub paused_at: Option<i64>,
    pub resumed_at: Option<i64>,
    pub pause_reason: Option<String>,
    pub pause_duration_minutes: i64,
    pub completed_at: Option<i64>,
    pub active_duration_minutes: Option<i64>,

    // -- Cancellation / rescheduling --
    pub cancelled_at: Option<i64>,
    /// User id of whoever cancelled
    pub cancelled_by: Option<i64>,
    pub cancellation_reason: Option<String>,
    pub rescheduled_from_id: Option<i64>,
    pub rescheduled_to_id: Option<i64>,

    pub created_at: i64,
    pub updated_at: i64,

    // -- Relations (populated by application code, skipped by FromRow) --
    #[cfg_attr(feature = "db", sqlx(skip))]
    #[serde(default)]
    pub services: Vec<AppointmentService>,
}

/// POST /appointments body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentCreate {
    pub barber_id: i64,
    pub service_ids: Vec<i64>,
    /// Start time: RFC 3339, or a local `YYYY-MM-DDTHH:MM[:SS]` in the business time zone
    #[serde(alias = "appointment_date")]
    pub start_time: String,
    /// Required when staff books on behalf of a client
    pub client_id: Option<i64>,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    pub notes: Option<String>,
}

/// PUT /appointments/{id} body (partial update)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    /// Move the booking (same duration)
    #[serde(alias = "appointment_date")]
    pub start_time: Option<String>,
    /// Lifecycle target, applied through the state machine
    pub status: Option<String>,
    /// Client notes
    pub notes: Option<String>,
    pub barber_notes: Option<String>,
}

/// PUT /appointments/{id}/status-simple body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: String,
    /// Cancellation or pause reason
    pub reason: Option<String>,
}

/// Optional reason for pause / cancel actions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReasonBody {
    pub reason: Option<String>,
}

/// POST /appointments/{id}/reschedule body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    #[serde(alias = "appointment_date")]
    pub start_time: String,
    /// Move to another barber (defaults to the same one)
    pub barber_id: Option<i64>,
}

/// Result of a reschedule: the old booking and its replacement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleResult {
    pub previous: Appointment,
    pub appointment: Appointment,
}

/// One slot in the availability grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Local wall-clock time, `HH:MM`
    pub time: String,
    pub start_at: i64,
    pub end_at: i64,
    pub available: bool,
    /// Booking occupying the slot, if any
    pub appointment_id: Option<i64>,
}

/// GET /appointments/availability response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub barber_id: i64,
    pub barber_name: String,
    pub date: String,
    pub slot_minutes: i64,
    pub slots: Vec<TimeSlot>,
}

/// Public view returned by GET /appointments/by-code/{code}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentLookup {
    pub id: i64,
    pub code: String,
    pub status: AppointmentStatus,
    pub client_name: String,
    pub barber_name: String,
    pub start_at: i64,
    /// Local time, `DD/MM/YYYY HH:MM`
    pub formatted_date: String,
    pub duration_minutes: i64,
    pub total_amount: f64,
    pub notes: Option<String>,
    pub can_cancel: bool,
    pub created_at: i64,
}
