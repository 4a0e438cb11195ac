//! Commission Repository
//!
//! One commission per appointment: the partial unique index on
//! `appointment_id` is the final guard, and appointment-bound inserts are
//! conditional so re-running auto-generation never duplicates.

use chrono::NaiveDate;
use chrono_tz::Tz;
use shared::models::{
    AutoGenerateResult, BarberCommissionTotal, Commission, CommissionSummary, CommissionTotals,
    CommissionType, GeneratedCommission, ShopCommissionSummary,
};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

use super::{RepoError, RepoResult};
use crate::scheduling::commission::{self as calc, CommissionAmount};
use crate::scheduling::DomainError;
use crate::utils::time::local_date;

const COMMISSION_COLUMNS: &str = "id, barber_id, appointment_id, commission_type, base_amount, rate, amount, \
     percentage, description, commission_date, created_at, updated_at";

/// A completed-or-not appointment joined with what a commission needs
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommissionSource {
    pub appointment_id: i64,
    pub barber_id: i64,
    pub status: shared::models::AppointmentStatus,
    pub final_amount: f64,
    pub start_at: i64,
    pub barber_rate: Option<f64>,
    pub client_name: String,
    pub has_commission: bool,
}

impl CommissionSource {
    pub fn description(&self) -> String {
        format!(
            "Commission for appointment #{} - {}",
            self.appointment_id, self.client_name
        )
    }
}

const SOURCE_SELECT: &str = "SELECT a.id AS appointment_id, a.barber_id, a.status, a.final_amount, a.start_at, \
     b.commission_rate AS barber_rate, c.name AS client_name, \
     EXISTS (SELECT 1 FROM commissions k WHERE k.appointment_id = a.id) AS has_commission \
     FROM appointments a JOIN barbers b ON b.id = a.barber_id JOIN clients c ON c.id = a.client_id";

/// Row to insert
#[derive(Debug, Clone)]
pub struct NewCommission {
    pub barber_id: i64,
    pub appointment_id: Option<i64>,
    pub commission_type: CommissionType,
    pub amount: CommissionAmount,
    pub description: Option<String>,
    pub commission_date: NaiveDate,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Commission>> {
    let sql = format!("SELECT {COMMISSION_COLUMNS} FROM commissions WHERE id = ?");
    let commission = sqlx::query_as::<_, Commission>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(commission)
}

pub async fn find_by_appointment(
    pool: &SqlitePool,
    appointment_id: i64,
) -> RepoResult<Option<Commission>> {
    let sql = format!("SELECT {COMMISSION_COLUMNS} FROM commissions WHERE appointment_id = ?");
    let commission = sqlx::query_as::<_, Commission>(&sql)
        .bind(appointment_id)
        .fetch_optional(pool)
        .await?;
    Ok(commission)
}

/// Commissions of one barber, newest first; dates are inclusive `YYYY-MM-DD`
pub async fn find_by_barber(
    pool: &SqlitePool,
    barber_id: i64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> RepoResult<Vec<Commission>> {
    let sql = format!(
        "SELECT {COMMISSION_COLUMNS} FROM commissions \
         WHERE barber_id = ?1 AND (?2 IS NULL OR commission_date >= ?2) AND (?3 IS NULL OR commission_date <= ?3) \
         ORDER BY commission_date DESC, created_at DESC"
    );
    let commissions = sqlx::query_as::<_, Commission>(&sql)
        .bind(barber_id)
        .bind(from.map(|d| d.to_string()))
        .bind(to.map(|d| d.to_string()))
        .fetch_all(pool)
        .await?;
    Ok(commissions)
}

pub async fn find_all(pool: &SqlitePool, skip: i64, limit: i64) -> RepoResult<Vec<Commission>> {
    let sql = format!(
        "SELECT {COMMISSION_COLUMNS} FROM commissions ORDER BY commission_date DESC, created_at DESC LIMIT ? OFFSET ?"
    );
    let commissions = sqlx::query_as::<_, Commission>(&sql)
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await?;
    Ok(commissions)
}

pub async fn find_source(pool: &SqlitePool, appointment_id: i64) -> RepoResult<Option<CommissionSource>> {
    let sql = format!("{SOURCE_SELECT} WHERE a.id = ?");
    let source = sqlx::query_as::<_, CommissionSource>(&sql)
        .bind(appointment_id)
        .fetch_optional(pool)
        .await?;
    Ok(source)
}

/// Completed appointments that have no commission yet
pub async fn pending_sources(pool: &SqlitePool) -> RepoResult<Vec<CommissionSource>> {
    let sql = format!(
        "{SOURCE_SELECT} WHERE a.status = 'completed' \
         AND NOT EXISTS (SELECT 1 FROM commissions k WHERE k.appointment_id = a.id) \
         ORDER BY a.start_at"
    );
    let sources = sqlx::query_as::<_, CommissionSource>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(sources)
}

/// Insert a commission.
///
/// Appointment-bound rows fail with [`DomainError::CommissionExists`] when
/// the appointment already has one.
pub async fn create(pool: &SqlitePool, data: &NewCommission) -> RepoResult<Commission> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    let result = sqlx::query(
        "INSERT INTO commissions (id, barber_id, appointment_id, commission_type, base_amount, rate, amount, \
         percentage, description, commission_date, created_at, updated_at) \
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11 \
         WHERE ?3 IS NULL OR NOT EXISTS (SELECT 1 FROM commissions WHERE appointment_id = ?3)",
    )
    .bind(id)
    .bind(data.barber_id)
    .bind(data.appointment_id)
    .bind(data.commission_type)
    .bind(data.amount.base_amount)
    .bind(data.amount.rate)
    .bind(data.amount.amount)
    .bind(data.amount.percentage)
    .bind(&data.description)
    .bind(data.commission_date.to_string())
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => return Err(DomainError::CommissionExists.into()),
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(DomainError::CommissionExists.into());
        }
        Err(e) => return Err(e.into()),
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create commission".into()))
}

/// Commission for one completed appointment, from its source row
pub fn from_source(
    source: &CommissionSource,
    default_rate: f64,
    tz: Tz,
) -> Result<NewCommission, DomainError> {
    if source.status != shared::models::AppointmentStatus::Completed {
        return Err(DomainError::NotCompleted);
    }
    let amount = calc::calculate(source.final_amount, source.barber_rate, default_rate)?;
    Ok(NewCommission {
        barber_id: source.barber_id,
        appointment_id: Some(source.appointment_id),
        commission_type: CommissionType::Service,
        amount,
        description: Some(source.description()),
        commission_date: local_date(source.start_at, tz),
    })
}

/// Create the missing commission of every completed appointment.
///
/// Safe to re-run and to run concurrently: rows someone else created in the
/// meantime are skipped.
pub async fn auto_generate(
    pool: &SqlitePool,
    default_rate: f64,
    tz: Tz,
) -> RepoResult<AutoGenerateResult> {
    let mut generated = Vec::new();
    for source in pending_sources(pool).await? {
        let data = match from_source(&source, default_rate, tz) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(appointment_id = source.appointment_id, error = %e, "Skipping commission");
                continue;
            }
        };
        match create(pool, &data).await {
            Ok(c) => generated.push(GeneratedCommission {
                commission_id: c.id,
                appointment_id: source.appointment_id,
                barber_id: c.barber_id,
                amount: c.amount,
            }),
            Err(RepoError::Domain(DomainError::CommissionExists)) => {
                tracing::debug!(appointment_id = source.appointment_id, "Commission created concurrently");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(AutoGenerateResult {
        generated_count: generated.len(),
        total_amount: calc::sum(generated.iter().map(|g| g.amount)),
        commissions: generated,
    })
}

/// Totals of a set of commissions
pub fn totals(commissions: &[Commission]) -> CommissionTotals {
    let of_type = |t: CommissionType| {
        calc::sum(
            commissions
                .iter()
                .filter(|c| c.commission_type == t)
                .map(|c| c.amount),
        )
    };
    CommissionTotals {
        count: commissions.len() as i64,
        total: calc::sum(commissions.iter().map(|c| c.amount)),
        service_total: of_type(CommissionType::Service),
        product_total: of_type(CommissionType::Product),
    }
}

/// Summary for one barber relative to `today` (local date)
pub async fn summary(
    pool: &SqlitePool,
    barber_id: i64,
    barber_name: String,
    today: NaiveDate,
) -> RepoResult<CommissionSummary> {
    let commissions = find_by_barber(pool, barber_id, None, None).await?;
    Ok(summarize(barber_id, barber_name, &commissions, today))
}

fn summarize(
    barber_id: i64,
    barber_name: String,
    commissions: &[Commission],
    today: NaiveDate,
) -> CommissionSummary {
    let mut months: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for c in commissions {
        let month = c.commission_date.get(..7).unwrap_or(&c.commission_date).to_string();
        months.entry(month).or_default().push(c.amount);
    }
    let by_month = months
        .into_iter()
        .map(|(month, amounts)| (month, calc::sum(amounts)))
        .collect();

    // windows: (today-30, today] and (today-60, today-30]
    let window = |from: i64, to: i64| {
        let from = (today - chrono::Duration::days(from)).to_string();
        let to = (today - chrono::Duration::days(to)).to_string();
        calc::sum(
            commissions
                .iter()
                .filter(|c| c.commission_date > from && c.commission_date <= to)
                .map(|c| c.amount),
        )
    };
    let last_30_days = window(30, 0);
    let previous_30_days = window(60, 30);

    CommissionSummary {
        barber_id,
        barber_name,
        totals: totals(commissions),
        by_month,
        last_30_days,
        previous_30_days,
        growth_percentage: calc::growth_percentage(last_30_days, previous_30_days),
    }
}

/// Shop-wide totals between two local dates (inclusive), split per barber
pub async fn shop_summary(
    pool: &SqlitePool,
    from: NaiveDate,
    to: NaiveDate,
) -> RepoResult<ShopCommissionSummary> {
    let sql = format!(
        "SELECT {COMMISSION_COLUMNS} FROM commissions WHERE commission_date >= ?1 AND commission_date <= ?2 \
         ORDER BY commission_date DESC, created_at DESC"
    );
    let commissions = sqlx::query_as::<_, Commission>(&sql)
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_all(pool)
        .await?;

    // deleted barbers keep their name for reporting
    let names: BTreeMap<i64, String> = sqlx::query_as::<_, (i64, String)>(
        "SELECT DISTINCT b.id, b.name FROM barbers b JOIN commissions c ON c.barber_id = b.id \
         WHERE c.commission_date >= ?1 AND c.commission_date <= ?2",
    )
    .bind(from.to_string())
    .bind(to.to_string())
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect();

    Ok(ShopCommissionSummary {
        date_from: from.to_string(),
        date_to: to.to_string(),
        totals: totals(&commissions),
        by_barber: per_barber(&commissions, &names),
    })
}

fn per_barber(commissions: &[Commission], names: &BTreeMap<i64, String>) -> Vec<BarberCommissionTotal> {
    let mut grouped: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for c in commissions {
        grouped.entry(c.barber_id).or_default().push(c.amount);
    }
    grouped
        .into_iter()
        .map(|(barber_id, amounts)| BarberCommissionTotal {
            barber_id,
            barber_name: names
                .get(&barber_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".into()),
            count: amounts.len() as i64,
            total: calc::sum(amounts),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::{seed_barber, seed_client, test_pool};

    const T0: i64 = 1_753_092_000_000; // 2025-07-21 10:00 UTC

    async fn seed_completed(pool: &SqlitePool, barber_id: i64, price: f64) -> i64 {
        let client_id = seed_client(pool).await;
        let id = shared::util::snowflake_id();
        sqlx::query(
            "INSERT INTO appointments (id, code, client_id, barber_id, status, start_at, end_at, duration_minutes, \
             total_amount, final_amount, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 'completed', ?, ?, 30, ?, ?, 0, 0)",
        )
        .bind(id)
        .bind(shared::util::appointment_code())
        .bind(client_id)
        .bind(barber_id)
        .bind(T0)
        .bind(T0 + 30 * 60_000)
        .bind(price)
        .bind(price)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_auto_generate_is_idempotent() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, Some(0.30)).await;
        let default_rate_barber = seed_barber(&pool, None).await;
        seed_completed(&pool, barber, 100.0).await;
        seed_completed(&pool, default_rate_barber, 50.0).await;

        let first = auto_generate(&pool, 0.30, chrono_tz::UTC).await.unwrap();
        assert_eq!(first.generated_count, 2);
        assert_eq!(first.total_amount, 45.0);

        let second = auto_generate(&pool, 0.30, chrono_tz::UTC).await.unwrap();
        assert_eq!(second.generated_count, 0);

        let all = find_all(&pool, 0, 100).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(calc::sum(all.iter().map(|c| c.amount)), 45.0);
    }

    #[tokio::test]
    async fn test_generated_commission_fields() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, Some(0.30)).await;
        let appointment = seed_completed(&pool, barber, 100.0).await;

        auto_generate(&pool, 0.25, chrono_tz::UTC).await.unwrap();
        let c = find_by_appointment(&pool, appointment).await.unwrap().unwrap();
        assert_eq!(c.amount, 30.0);
        assert_eq!(c.percentage, 30.0);
        assert_eq!(c.base_amount, 100.0);
        assert_eq!(c.commission_date, "2025-07-21");
        assert_eq!(
            c.description.as_deref(),
            Some(format!("Commission for appointment #{appointment} - Maria").as_str())
        );
    }

    #[tokio::test]
    async fn test_second_commission_for_appointment_is_rejected() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, None).await;
        let appointment = seed_completed(&pool, barber, 80.0).await;

        let source = find_source(&pool, appointment).await.unwrap().unwrap();
        let data = from_source(&source, 0.30, chrono_tz::UTC).unwrap();
        create(&pool, &data).await.unwrap();

        let err = create(&pool, &data).await.unwrap_err();
        assert!(matches!(err, RepoError::Domain(DomainError::CommissionExists)));
        assert!(find_source(&pool, appointment).await.unwrap().unwrap().has_commission);
    }

    #[tokio::test]
    async fn test_product_commissions_are_not_unique() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, None).await;
        let data = NewCommission {
            barber_id: barber,
            appointment_id: None,
            commission_type: CommissionType::Product,
            amount: calc::calculate(40.0, None, 0.25).unwrap(),
            description: None,
            commission_date: NaiveDate::from_ymd_opt(2025, 7, 21).unwrap(),
        };
        create(&pool, &data).await.unwrap();
        create(&pool, &data).await.unwrap();
        assert_eq!(find_by_barber(&pool, barber, None, None).await.unwrap().len(), 2);
    }

    fn commission(date: &str, amount: f64, commission_type: CommissionType) -> Commission {
        Commission {
            id: 1,
            barber_id: 1,
            appointment_id: None,
            commission_type,
            base_amount: amount,
            rate: 1.0,
            amount,
            percentage: 100.0,
            description: None,
            commission_date: date.into(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_summary_windows_and_growth() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 31).unwrap();
        let commissions = vec![
            commission("2025-07-30", 30.0, CommissionType::Service),
            commission("2025-07-10", 10.0, CommissionType::Product),
            commission("2025-06-20", 20.0, CommissionType::Service),
        ];
        let s = summarize(1, "João".into(), &commissions, today);
        assert_eq!(s.totals.count, 3);
        assert_eq!(s.totals.total, 60.0);
        assert_eq!(s.totals.service_total, 50.0);
        assert_eq!(s.totals.product_total, 10.0);
        assert_eq!(s.by_month.get("2025-07"), Some(&40.0));
        assert_eq!(s.by_month.get("2025-06"), Some(&20.0));
        assert_eq!(s.last_30_days, 40.0);
        assert_eq!(s.previous_30_days, 20.0);
        assert_eq!(s.growth_percentage, Some(100.0));
    }

    #[test]
    fn test_per_barber_groups_and_names() {
        let mut a = commission("2025-07-01", 12.5, CommissionType::Service);
        a.barber_id = 7;
        let mut b = commission("2025-07-02", 7.25, CommissionType::Product);
        b.barber_id = 7;
        let mut c = commission("2025-07-03", 3.0, CommissionType::Service);
        c.barber_id = 9;
        let names = BTreeMap::from([(7, "Carlos".to_string())]);

        let lines = per_barber(&[a, b, c], &names);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].barber_name, "Carlos");
        assert_eq!(lines[0].count, 2);
        assert_eq!(lines[0].total, 19.75);
        assert_eq!(lines[1].barber_name, "Unknown");
        assert_eq!(lines[1].total, 3.0);
    }

    #[tokio::test]
    async fn test_shop_summary_respects_dates() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, Some(0.5)).await;
        seed_completed(&pool, barber, 100.0).await;
        auto_generate(&pool, 0.30, chrono_tz::UTC).await.unwrap();

        let july = shop_summary(
            &pool,
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(july.totals.count, 1);
        assert_eq!(july.totals.service_total, 50.0);
        assert_eq!(july.by_barber[0].barber_name, "João");

        let august = shop_summary(
            &pool,
            NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 31).unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(august.totals.count, 0);
        assert!(august.by_barber.is_empty());
    }
}
