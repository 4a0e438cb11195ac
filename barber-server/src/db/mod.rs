//! Database Module
//!
//! SQLite connection pool, migrations and bootstrap data

pub mod repository;

use shared::models::{Role, UserCreate};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

use crate::auth::password;
use repository::{RepoError, RepoResult, user};

/// Database service — owns a SQLite connection pool
#[derive(Clone)]
pub struct DbService {
    pub pool: SqlitePool,
}

impl DbService {
    /// Open (or create) the database with WAL mode and apply migrations
    pub async fn new(db_path: &str) -> RepoResult<Self> {
        // Build connection options: WAL, foreign keys, normal sync
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| RepoError::Database(format!("Invalid database path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            // 写冲突时等待 5s 而非立即失败 (每个连接都生效)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| RepoError::Database(format!("Failed to open database: {e}")))?;

        tracing::info!(path = %db_path, "Database connection established (SQLite WAL, busy_timeout=5000ms)");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| RepoError::Database(format!("Failed to apply migrations: {e}")))?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }

    /// Seed the bootstrap admin when no admin account exists
    pub async fn ensure_admin(&self, email: &str, admin_password: &str) -> RepoResult<()> {
        if user::count_by_role(&self.pool, Role::Admin).await? > 0 {
            return Ok(());
        }

        let password_hash = password::hash_password(admin_password)
            .map_err(|e| RepoError::Database(format!("Failed to hash admin password: {e}")))?;

        let admin = user::create(
            &self.pool,
            UserCreate {
                email: email.to_string(),
                full_name: "Administrator".to_string(),
                phone: None,
                role: Role::Admin,
                password_hash: Some(password_hash),
                google_sub: None,
            },
        )
        .await?;

        tracing::info!(user_id = admin.id, email = %admin.email, "Bootstrap admin account created");
        Ok(())
    }
}
