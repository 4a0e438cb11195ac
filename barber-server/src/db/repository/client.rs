//! Client Repository

use super::{RepoError, RepoResult};
use shared::models::{Client, ClientCreate, ClientUpdate};
use sqlx::{Sqlite, SqlitePool, Transaction};

const CLIENT_COLUMNS: &str =
    "id, user_id, name, email, phone, notes, deleted_at, created_at, updated_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Client>> {
    let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ? AND deleted_at IS NULL");
    let client = sqlx::query_as::<_, Client>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(client)
}

/// Search by name, email or phone (substring, case-insensitive)
pub async fn find_all(
    pool: &SqlitePool,
    search: Option<&str>,
    skip: i64,
    limit: i64,
) -> RepoResult<Vec<Client>> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s.to_lowercase()));
    let sql = format!(
        "SELECT {CLIENT_COLUMNS} FROM clients WHERE deleted_at IS NULL \
         AND (?1 IS NULL OR lower(name) LIKE ?1 OR lower(COALESCE(email, '')) LIKE ?1 OR COALESCE(phone, '') LIKE ?1) \
         ORDER BY name LIMIT ?2 OFFSET ?3"
    );
    let clients = sqlx::query_as::<_, Client>(&sql)
        .bind(pattern)
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await?;
    Ok(clients)
}

pub async fn create(pool: &SqlitePool, data: ClientCreate) -> RepoResult<Client> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO clients (id, user_id, name, email, phone, notes, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(data.user_id)
    .bind(&data.name)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(&data.notes)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => RepoError::Duplicate("User already has a client profile".into()),
        other => other,
    })?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create client".into()))
}

/// Client profile for a user, created from the account data when missing
///
/// Runs inside the booking transaction so the profile and the appointment
/// appear together.
pub async fn ensure_for_user(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
) -> RepoResult<i64> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM clients WHERE user_id = ? AND deleted_at IS NULL")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "INSERT INTO clients (id, user_id, name, email, phone, created_at, updated_at) \
         SELECT ?, u.id, u.full_name, u.email, u.phone, ?, ? FROM users u WHERE u.id = ?",
    )
    .bind(id)
    .bind(now)
    .bind(now)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("User {user_id} not found")));
    }
    tracing::info!(user_id, client_id = id, "Client profile created on first booking");
    Ok(id)
}

pub async fn update(pool: &SqlitePool, id: i64, data: ClientUpdate) -> RepoResult<Client> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE clients SET name = COALESCE(?1, name), email = COALESCE(?2, email), phone = COALESCE(?3, phone), \
         notes = COALESCE(?4, notes), updated_at = ?5 WHERE id = ?6 AND deleted_at IS NULL",
    )
    .bind(&data.name)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(&data.notes)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Client {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Client {id} not found")))
}

pub async fn soft_delete(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE clients SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Client {id} not found")));
    }
    Ok(())
}
