//! Barber Model

use serde::{Deserialize, Serialize};

use super::RecordState;

/// Barber profile (service provider)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Barber {
    pub id: i64,
    /// Linked login account
    pub user_id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialties: Option<String>,
    /// Commission rate (0..=1); the configured default applies when absent
    pub commission_rate: Option<f64>,
    /// Taking new bookings
    pub is_available: bool,
    #[cfg_attr(feature = "db", sqlx(rename = "deleted_at", try_from = "Option<i64>"))]
    pub record: RecordState,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create barber payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarberCreate {
    pub name: String,
    pub user_id: Option<i64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialties: Option<String>,
    pub commission_rate: Option<f64>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

/// Update barber payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BarberUpdate {
    pub name: Option<String>,
    pub user_id: Option<i64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialties: Option<String>,
    pub commission_rate: Option<f64>,
    pub is_available: Option<bool>,
}

fn default_true() -> bool {
    true
}
