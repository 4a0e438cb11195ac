//! Repository Module
//!
//! One module per table, free async functions taking `&SqlitePool` (or a
//! transaction for multi-statement writes). Queries are plain SQL with
//! positional binds.

pub mod appointment;
pub mod barber;
pub mod barber_block;
pub mod client;
pub mod commission;
pub mod service;
pub mod user;

use thiserror::Error;

use crate::scheduling::DomainError;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Business rule enforced by the write itself (conditional insert / CAS)
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound("Record not found".into()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                tracing::warn!(error = %db_err.message(), "Unique constraint violated");
                RepoError::Duplicate("Record already exists".into())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                tracing::warn!(error = %db_err.message(), "Foreign key constraint violated");
                RepoError::Validation("Referenced record does not exist".into())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Default page size for list endpoints
pub const DEFAULT_LIMIT: i64 = 100;
/// Upper bound for page size
pub const MAX_LIMIT: i64 = 500;

/// Clamp user-supplied paging
pub fn paging(skip: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let skip = skip.unwrap_or(0).max(0);
    (skip, limit)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::db::DbService;
    use shared::models::{BarberCreate, ClientCreate, ServiceCreate};
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    /// Fresh migrated database in a temp dir (keep the TempDir alive)
    pub async fn test_pool() -> (SqlitePool, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("test.db");
        let db = DbService::new(path.to_str().expect("utf8 path"))
            .await
            .expect("open test db");
        (db.pool, dir)
    }

    pub async fn seed_barber(pool: &SqlitePool, rate: Option<f64>) -> i64 {
        barber::create(
            pool,
            BarberCreate {
                name: "João".into(),
                user_id: None,
                email: None,
                phone: None,
                specialties: None,
                commission_rate: rate,
                is_available: true,
            },
        )
        .await
        .expect("seed barber")
        .id
    }

    pub async fn seed_client(pool: &SqlitePool) -> i64 {
        client::create(
            pool,
            ClientCreate {
                name: "Maria".into(),
                user_id: None,
                email: None,
                phone: None,
                notes: None,
            },
        )
        .await
        .expect("seed client")
        .id
    }

    pub async fn seed_service(pool: &SqlitePool, minutes: i64, price: f64, pausable: bool) -> i64 {
        service::create(
            pool,
            ServiceCreate {
                name: format!("Service {minutes}m"),
                description: None,
                duration_minutes: minutes,
                price,
                supports_pause: pausable,
                expected_pause_minutes: if pausable { 20 } else { 0 },
            },
        )
        .await
        .expect("seed service")
        .id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_clamps() {
        assert_eq!(paging(None, None), (0, DEFAULT_LIMIT));
        assert_eq!(paging(Some(-5), Some(10_000)), (0, MAX_LIMIT));
        assert_eq!(paging(Some(20), Some(0)), (20, 1));
    }

    #[tokio::test]
    async fn test_constraint_errors_hide_sqlite_text() {
        let (pool, _dir) = test_support::test_pool().await;
        let id = test_support::seed_service(&pool, 30, 40.0, false).await;

        let err: RepoError = sqlx::query(
            "INSERT INTO services (id, name, duration_minutes, price, created_at, updated_at) VALUES (?, 'x', 30, 1, 0, 0)",
        )
        .bind(id)
        .execute(&pool)
        .await
        .unwrap_err()
        .into();
        match err {
            RepoError::Duplicate(msg) => assert!(!msg.contains("UNIQUE"), "{msg}"),
            other => panic!("expected duplicate, got {other:?}"),
        }

        let err: RepoError = sqlx::query(
            "INSERT INTO appointment_services (appointment_id, service_id, name, price, duration_minutes) VALUES (424242, ?, 'x', 1, 30)",
        )
        .bind(id)
        .execute(&pool)
        .await
        .unwrap_err()
        .into();
        match err {
            RepoError::Validation(msg) => assert!(!msg.contains("FOREIGN KEY"), "{msg}"),
            other => panic!("expected validation, got {other:?}"),
        }
    }
}
