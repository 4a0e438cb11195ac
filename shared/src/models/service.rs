//! Service Model (priced, timed offering)

use serde::{Deserialize, Serialize};

use super::RecordState;

/// Bookable service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub price: f64,
    /// Has a dwell time during which the barber is free (e.g. chemical treatment)
    pub supports_pause: bool,
    /// Typical dwell time, informational
    pub expected_pause_minutes: i64,
    pub is_active: bool,
    #[cfg_attr(feature = "db", sqlx(rename = "deleted_at", try_from = "Option<i64>"))]
    pub record: RecordState,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create service payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCreate {
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub price: f64,
    #[serde(default)]
    pub supports_pause: bool,
    #[serde(default)]
    pub expected_pause_minutes: i64,
}

/// Update service payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i64>,
    pub price: Option<f64>,
    pub supports_pause: Option<bool>,
    pub expected_pause_minutes: Option<i64>,
    pub is_active: Option<bool>,
}
