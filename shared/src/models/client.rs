//! Client Model

use serde::{Deserialize, Serialize};

use super::RecordState;

/// Client (customer) profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Client {
    pub id: i64,
    /// Linked login account (at most one client per account)
    pub user_id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    #[cfg_attr(feature = "db", sqlx(rename = "deleted_at", try_from = "Option<i64>"))]
    pub record: RecordState,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create client payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCreate {
    pub name: String,
    pub user_id: Option<i64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// Update client payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}
