//! User Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum Role {
    Admin,
    Manager,
    Barber,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Barber => "barber",
            Self::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "barber" => Ok(Self::Barber),
            "client" => Ok(Self::Client),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    /// Login name
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    /// Argon2 PHC string; absent for Google-only accounts
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    /// Google account subject, when linked
    #[serde(skip_serializing, default)]
    pub google_sub: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create user payload (internal, password already hashed)
#[derive(Debug, Clone)]
pub struct UserCreate {
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub password_hash: Option<String>,
    pub google_sub: Option<String>,
}

/// POST /auth/login body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/register body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
}

/// POST /auth/google body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleLoginRequest {
    /// Google ID token (the `credential` returned by Google Identity Services)
    pub credential: String,
}

/// Authenticated user info returned by login and /auth/me
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub permissions: Vec<String>,
    /// Barber profile linked to this account
    pub barber_id: Option<i64>,
    /// Client profile linked to this account
    pub client_id: Option<i64>,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: UserInfo,
}
