//! User Repository

use super::{RepoError, RepoResult};
use shared::models::{Client, Role, User, UserCreate};
use sqlx::SqlitePool;

const USER_COLUMNS: &str =
    "id, email, full_name, phone, role, password_hash, google_sub, is_active, created_at, updated_at";

/// Role, status and linked profiles of an account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileLinks {
    pub role: Role,
    pub is_active: bool,
    pub barber_id: Option<i64>,
    pub client_id: Option<i64>,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Case-insensitive (column is `COLLATE NOCASE`)
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? LIMIT 1");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_google_sub(pool: &SqlitePool, sub: &str) -> RepoResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE google_sub = ? LIMIT 1");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(sub)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_profile_links(pool: &SqlitePool, user_id: i64) -> RepoResult<Option<ProfileLinks>> {
    let links = sqlx::query_as::<_, ProfileLinks>(
        "SELECT u.role, u.is_active, \
         (SELECT b.id FROM barbers b WHERE b.user_id = u.id AND b.deleted_at IS NULL) AS barber_id, \
         (SELECT c.id FROM clients c WHERE c.user_id = u.id AND c.deleted_at IS NULL) AS client_id \
         FROM users u WHERE u.id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(links)
}

pub async fn count_by_role(pool: &SqlitePool, role: Role) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
        .bind(role)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn create(pool: &SqlitePool, data: UserCreate) -> RepoResult<User> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO users (id, email, full_name, phone, role, password_hash, google_sub, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(data.email.trim())
    .bind(&data.full_name)
    .bind(&data.phone)
    .bind(data.role)
    .bind(&data.password_hash)
    .bind(&data.google_sub)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| duplicate_email(e, &data.email))?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))
}

/// Create a client account and its client profile in one transaction
pub async fn create_client_account(pool: &SqlitePool, data: UserCreate) -> RepoResult<(User, Client)> {
    let user_id = shared::util::snowflake_id();
    let client_id = shared::util::snowflake_id();
    let now = shared::util::now_millis();

    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO users (id, email, full_name, phone, role, password_hash, google_sub, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, 'client', ?, ?, 1, ?, ?)",
    )
    .bind(user_id)
    .bind(data.email.trim())
    .bind(&data.full_name)
    .bind(&data.phone)
    .bind(&data.password_hash)
    .bind(&data.google_sub)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| duplicate_email(e, &data.email))?;

    sqlx::query(
        "INSERT INTO clients (id, user_id, name, email, phone, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(client_id)
    .bind(user_id)
    .bind(&data.full_name)
    .bind(data.email.trim())
    .bind(&data.phone)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    let user = find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))?;
    let client = super::client::find_by_id(pool, client_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create client profile".into()))?;
    Ok((user, client))
}

/// Attach a Google account to an existing user
pub async fn link_google_sub(pool: &SqlitePool, id: i64, sub: &str) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE users SET google_sub = ?, updated_at = ? WHERE id = ?")
        .bind(sub)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {id} not found")));
    }
    Ok(())
}

fn duplicate_email(err: sqlx::Error, email: &str) -> RepoError {
    match RepoError::from(err) {
        RepoError::Duplicate(_) => RepoError::Duplicate(format!("Email {} is already registered", email.trim())),
        other => other,
    }
}
