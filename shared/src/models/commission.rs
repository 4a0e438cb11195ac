//! Commission Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the commission was earned on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum CommissionType {
    #[default]
    Service,
    Product,
}

/// Commission owed to a barber
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Commission {
    pub id: i64,
    pub barber_id: i64,
    /// At most one commission per appointment
    pub appointment_id: Option<i64>,
    pub commission_type: CommissionType,
    pub base_amount: f64,
    /// Fraction 0..=1
    pub rate: f64,
    pub amount: f64,
    /// `rate * 100`
    pub percentage: f64,
    pub description: Option<String>,
    /// Local date, `YYYY-MM-DD`
    pub commission_date: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// POST /commissions/create body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionCreate {
    pub barber_id: i64,
    #[serde(default)]
    pub commission_type: CommissionType,
    /// Required for service commissions
    pub appointment_id: Option<i64>,
    /// Required for product commissions
    pub base_amount: Option<f64>,
    /// Percentage (0-100) overriding the default product rate
    pub percentage: Option<f64>,
    pub description: Option<String>,
}

/// Preview returned by POST /commissions/calculate-appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionCalculation {
    pub appointment_id: i64,
    pub barber_id: i64,
    pub base_amount: f64,
    pub rate: f64,
    pub amount: f64,
    pub percentage: f64,
    /// A commission already exists for this appointment
    pub already_generated: bool,
}

/// One row created by auto-generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedCommission {
    pub commission_id: i64,
    pub appointment_id: i64,
    pub barber_id: i64,
    pub amount: f64,
}

/// POST /commissions/auto-generate response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoGenerateResult {
    pub generated_count: usize,
    pub total_amount: f64,
    pub commissions: Vec<GeneratedCommission>,
}

/// Totals for one period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommissionTotals {
    pub count: i64,
    pub total: f64,
    pub service_total: f64,
    pub product_total: f64,
}

/// GET /commissions/barber/{id}/summary response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionSummary {
    pub barber_id: i64,
    pub barber_name: String,
    pub totals: CommissionTotals,
    /// `YYYY-MM` → total
    pub by_month: BTreeMap<String, f64>,
    pub last_30_days: f64,
    pub previous_30_days: f64,
    /// Percent change of the last 30 days over the 30 before; None when there is no baseline
    pub growth_percentage: Option<f64>,
}

/// One barber's line in the shop summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarberCommissionTotal {
    pub barber_id: i64,
    pub barber_name: String,
    pub total: f64,
    pub count: i64,
}

/// GET /commissions/summary response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopCommissionSummary {
    /// Inclusive `YYYY-MM-DD`
    pub date_from: String,
    /// Inclusive `YYYY-MM-DD`
    pub date_to: String,
    pub totals: CommissionTotals,
    /// Ordered by barber id
    pub by_barber: Vec<BarberCommissionTotal>,
}
