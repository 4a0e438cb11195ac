//! Barber Block Repository (time off)
//!
//! Blocks are stored with their resolved `[start_at, end_at)` interval so
//! booking can check them in SQL like any other busy interval.

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use shared::models::{BarberBlock, BarberBlockCreate, BarberBlockUpdate};
use sqlx::SqlitePool;

use super::{RepoError, RepoResult};
use crate::utils::time::{date_time_to_millis, day_end_millis, day_start_millis};

const BLOCK_COLUMNS: &str = "id, barber_id, block_date, start_time, end_time, all_day, reason, notes, \
     start_at, end_at, deleted_at, created_at, updated_at";

/// Normalized block period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpan {
    pub block_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub all_day: bool,
    pub start_at: i64,
    pub end_at: i64,
}

/// Resolve a block period in the business time zone.
///
/// All-day blocks cover the whole local day; partial blocks need both times
/// with `start < end`.
pub fn resolve_span(
    block_date: &str,
    start_time: Option<&str>,
    end_time: Option<&str>,
    all_day: bool,
    tz: Tz,
) -> RepoResult<BlockSpan> {
    let date = NaiveDate::parse_from_str(block_date.trim(), "%Y-%m-%d")
        .map_err(|_| RepoError::Validation(format!("Invalid date format: {block_date}")))?;

    if all_day {
        return Ok(BlockSpan {
            block_date: date,
            start_time: None,
            end_time: None,
            all_day: true,
            start_at: day_start_millis(date, tz),
            end_at: day_end_millis(date, tz),
        });
    }

    let (Some(start), Some(end)) = (start_time, end_time) else {
        return Err(RepoError::Validation(
            "Start and end time required for partial day blocks".into(),
        ));
    };
    let parse = |t: &str| {
        NaiveTime::parse_from_str(t.trim(), "%H:%M")
            .map_err(|_| RepoError::Validation(format!("Invalid time format: {t} (expected HH:MM)")))
    };
    let (start, end) = (parse(start)?, parse(end)?);
    if start >= end {
        return Err(RepoError::Validation("Start time must be before end time".into()));
    }

    Ok(BlockSpan {
        block_date: date,
        start_time: Some(start),
        end_time: Some(end),
        all_day: false,
        start_at: date_time_to_millis(date, start, tz),
        end_at: date_time_to_millis(date, end, tz),
    })
}

fn hhmm(t: Option<NaiveTime>) -> Option<String> {
    t.map(|t| t.format("%H:%M").to_string())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<BarberBlock>> {
    let sql = format!("SELECT {BLOCK_COLUMNS} FROM barber_blocks WHERE id = ? AND deleted_at IS NULL");
    let block = sqlx::query_as::<_, BarberBlock>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(block)
}

/// Active blocks, optionally for one barber and an inclusive date range
pub async fn find_all(
    pool: &SqlitePool,
    barber_id: Option<i64>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> RepoResult<Vec<BarberBlock>> {
    let sql = format!(
        "SELECT {BLOCK_COLUMNS} FROM barber_blocks WHERE deleted_at IS NULL \
         AND (?1 IS NULL OR barber_id = ?1) AND (?2 IS NULL OR block_date >= ?2) AND (?3 IS NULL OR block_date <= ?3) \
         ORDER BY block_date DESC, start_at"
    );
    let blocks = sqlx::query_as::<_, BarberBlock>(&sql)
        .bind(barber_id)
        .bind(from.map(|d| d.to_string()))
        .bind(to.map(|d| d.to_string()))
        .fetch_all(pool)
        .await?;
    Ok(blocks)
}

pub async fn create(pool: &SqlitePool, data: BarberBlockCreate, tz: Tz) -> RepoResult<BarberBlock> {
    let span = resolve_span(
        &data.block_date,
        data.start_time.as_deref(),
        data.end_time.as_deref(),
        data.all_day,
        tz,
    )?;
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO barber_blocks (id, barber_id, block_date, start_time, end_time, all_day, reason, notes, \
         start_at, end_at, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(data.barber_id)
    .bind(span.block_date.to_string())
    .bind(hhmm(span.start_time))
    .bind(hhmm(span.end_time))
    .bind(span.all_day)
    .bind(&data.reason)
    .bind(&data.notes)
    .bind(span.start_at)
    .bind(span.end_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create barber block".into()))
}

/// Partial update; the period is re-resolved from the merged fields
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    data: BarberBlockUpdate,
    tz: Tz,
) -> RepoResult<BarberBlock> {
    let current = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Barber block {id} not found")))?;

    let all_day = data.all_day.unwrap_or(current.all_day);
    let span = resolve_span(
        data.block_date.as_deref().unwrap_or(&current.block_date),
        data.start_time.as_deref().or(current.start_time.as_deref()),
        data.end_time.as_deref().or(current.end_time.as_deref()),
        all_day,
        tz,
    )?;

    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE barber_blocks SET block_date = ?1, start_time = ?2, end_time = ?3, all_day = ?4, \
         reason = COALESCE(?5, reason), notes = COALESCE(?6, notes), start_at = ?7, end_at = ?8, updated_at = ?9 \
         WHERE id = ?10 AND deleted_at IS NULL",
    )
    .bind(span.block_date.to_string())
    .bind(hhmm(span.start_time))
    .bind(hhmm(span.end_time))
    .bind(span.all_day)
    .bind(&data.reason)
    .bind(&data.notes)
    .bind(span.start_at)
    .bind(span.end_at)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Barber block {id} not found")));
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Barber block {id} not found")))
}

pub async fn soft_delete(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE barber_blocks SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Barber block {id} not found")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::appointment;
    use crate::db::repository::test_support::{seed_barber, test_pool};

    const UTC: Tz = chrono_tz::UTC;

    #[test]
    fn test_resolve_all_day() {
        let span = resolve_span("2025-07-21", Some("10:00"), None, true, UTC).unwrap();
        assert_eq!(span.start_time, None);
        assert_eq!(span.end_at - span.start_at, 24 * 60 * 60_000);
    }

    #[test]
    fn test_resolve_partial_requires_ordered_times() {
        assert!(matches!(
            resolve_span("2025-07-21", Some("12:00"), Some("12:00"), false, UTC),
            Err(RepoError::Validation(_))
        ));
        assert!(matches!(
            resolve_span("2025-07-21", Some("12:00"), None, false, UTC),
            Err(RepoError::Validation(_))
        ));
        let span = resolve_span("2025-07-21", Some("12:00"), Some("13:30"), false, UTC).unwrap();
        assert_eq!(span.end_at - span.start_at, 90 * 60_000);
    }

    #[tokio::test]
    async fn test_block_lifecycle_and_busy_intervals() {
        let (pool, _dir) = test_pool().await;
        let barber_id = seed_barber(&pool, None).await;

        let block = create(
            &pool,
            BarberBlockCreate {
                barber_id,
                block_date: "2025-07-21".into(),
                start_time: Some("12:00".into()),
                end_time: Some("13:00".into()),
                all_day: false,
                reason: Some("Lunch".into()),
                notes: None,
            },
            UTC,
        )
        .await
        .unwrap();
        assert_eq!(block.start_time.as_deref(), Some("12:00"));

        let day = NaiveDate::from_ymd_opt(2025, 7, 21).unwrap();
        let (from, to) = (day_start_millis(day, UTC), day_end_millis(day, UTC));
        assert_eq!(appointment::busy_intervals(&pool, barber_id, from, to).await.unwrap().len(), 1);

        let updated = update(
            &pool,
            block.id,
            BarberBlockUpdate {
                all_day: Some(true),
                ..Default::default()
            },
            UTC,
        )
        .await
        .unwrap();
        assert!(updated.all_day);
        assert_eq!(updated.reason.as_deref(), Some("Lunch"));
        assert_eq!(updated.start_at, from);

        soft_delete(&pool, block.id).await.unwrap();
        assert!(find_by_id(&pool, block.id).await.unwrap().is_none());
        assert!(appointment::busy_intervals(&pool, barber_id, from, to).await.unwrap().is_empty());
        assert!(find_all(&pool, Some(barber_id), Some(day), Some(day)).await.unwrap().is_empty());
    }
}
