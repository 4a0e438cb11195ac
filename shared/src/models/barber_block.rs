//! Barber Block Model (time off / unavailability)

use super::RecordState;
use serde::{Deserialize, Serialize};

/// A period the barber cannot take bookings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BarberBlock {
    pub id: i64,
    pub barber_id: i64,
    /// Local date, `YYYY-MM-DD`
    pub block_date: String,
    /// `HH:MM`, None for all-day blocks
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub all_day: bool,
    pub reason: Option<String>,
    pub notes: Option<String>,
    /// Resolved interval in Unix millis
    pub start_at: i64,
    pub end_at: i64,
    #[cfg_attr(feature = "db", sqlx(rename = "deleted_at", try_from = "Option<i64>"))]
    pub record: RecordState,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarberBlockCreate {
    pub barber_id: i64,
    pub block_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BarberBlockUpdate {
    pub block_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub all_day: Option<bool>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}
