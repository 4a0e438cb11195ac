//! Barber Repository
//!
//! Soft-deleted barbers are invisible to every lookup here.

use super::{RepoError, RepoResult};
use shared::models::{Barber, BarberCreate, BarberUpdate};
use sqlx::SqlitePool;

const BARBER_COLUMNS: &str = "id, user_id, name, email, phone, specialties, commission_rate, is_available, deleted_at, created_at, updated_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Barber>> {
    let sql = format!("SELECT {BARBER_COLUMNS} FROM barbers WHERE id = ? AND deleted_at IS NULL");
    let barber = sqlx::query_as::<_, Barber>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(barber)
}

pub async fn find_all(pool: &SqlitePool, available_only: bool) -> RepoResult<Vec<Barber>> {
    let sql = format!(
        "SELECT {BARBER_COLUMNS} FROM barbers WHERE deleted_at IS NULL AND (? = 0 OR is_available = 1) ORDER BY name"
    );
    let barbers = sqlx::query_as::<_, Barber>(&sql)
        .bind(available_only)
        .fetch_all(pool)
        .await?;
    Ok(barbers)
}

pub async fn create(pool: &SqlitePool, data: BarberCreate) -> RepoResult<Barber> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO barbers (id, user_id, name, email, phone, specialties, commission_rate, is_available, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(data.user_id)
    .bind(&data.name)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(&data.specialties)
    .bind(data.commission_rate)
    .bind(data.is_available)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => RepoError::Duplicate("User already has a barber profile".into()),
        other => other,
    })?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create barber".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: BarberUpdate) -> RepoResult<Barber> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE barbers SET name = COALESCE(?1, name), email = COALESCE(?2, email), phone = COALESCE(?3, phone), \
         specialties = COALESCE(?4, specialties), commission_rate = COALESCE(?5, commission_rate), \
         is_available = COALESCE(?6, is_available), updated_at = ?7 WHERE id = ?8 AND deleted_at IS NULL",
    )
    .bind(&data.name)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(&data.specialties)
    .bind(data.commission_rate)
    .bind(data.is_available)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Barber {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Barber {id} not found")))
}

/// Soft delete; existing appointments and commissions keep their reference
pub async fn soft_delete(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE barbers SET deleted_at = ?1, is_available = 0, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Barber {id} not found")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::{seed_barber, test_pool};

    #[tokio::test]
    async fn test_update_and_soft_delete() {
        let (pool, _dir) = test_pool().await;
        let id = seed_barber(&pool, Some(0.3)).await;

        let updated = update(
            &pool,
            id,
            BarberUpdate {
                commission_rate: Some(0.4),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.commission_rate, Some(0.4));
        assert_eq!(updated.name, "João");
        assert!(updated.record.is_active());

        soft_delete(&pool, id).await.unwrap();
        assert!(find_by_id(&pool, id).await.unwrap().is_none());
        assert!(find_all(&pool, false).await.unwrap().is_empty());
        assert!(matches!(
            soft_delete(&pool, id).await,
            Err(RepoError::NotFound(_))
        ));
    }
}
