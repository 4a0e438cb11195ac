//! Service Repository

use super::{RepoError, RepoResult};
use shared::models::{Service, ServiceCreate, ServiceUpdate};
use sqlx::SqlitePool;

const SERVICE_COLUMNS: &str = "id, name, description, duration_minutes, price, supports_pause, expected_pause_minutes, is_active, deleted_at, created_at, updated_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Service>> {
    let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ? AND deleted_at IS NULL");
    let service = sqlx::query_as::<_, Service>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(service)
}

pub async fn find_all(pool: &SqlitePool, active_only: bool) -> RepoResult<Vec<Service>> {
    let sql = format!(
        "SELECT {SERVICE_COLUMNS} FROM services WHERE deleted_at IS NULL AND (? = 0 OR is_active = 1) ORDER BY name"
    );
    let services = sqlx::query_as::<_, Service>(&sql)
        .bind(active_only)
        .fetch_all(pool)
        .await?;
    Ok(services)
}

pub async fn create(pool: &SqlitePool, data: ServiceCreate) -> RepoResult<Service> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO services (id, name, description, duration_minutes, price, supports_pause, expected_pause_minutes, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.duration_minutes)
    .bind(data.price)
    .bind(data.supports_pause)
    .bind(data.expected_pause_minutes)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create service".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: ServiceUpdate) -> RepoResult<Service> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE services SET name = COALESCE(?1, name), description = COALESCE(?2, description), \
         duration_minutes = COALESCE(?3, duration_minutes), price = COALESCE(?4, price), \
         supports_pause = COALESCE(?5, supports_pause), expected_pause_minutes = COALESCE(?6, expected_pause_minutes), \
         is_active = COALESCE(?7, is_active), updated_at = ?8 WHERE id = ?9 AND deleted_at IS NULL",
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.duration_minutes)
    .bind(data.price)
    .bind(data.supports_pause)
    .bind(data.expected_pause_minutes)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Service {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Service {id} not found")))
}

/// Soft delete; booked appointments keep their service snapshot
pub async fn soft_delete(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE services SET deleted_at = ?1, is_active = 0, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Service {id} not found")));
    }
    Ok(())
}
