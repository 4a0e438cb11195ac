//! Appointment Repository
//!
//! Booking and rescheduling never read-then-write: the overlap check is part
//! of the `INSERT`/`UPDATE` statement itself, and every write transaction
//! starts with a write statement so SQLite takes the writer lock before
//! evaluating it. Concurrent bookings for the same slot therefore serialize
//! and the loser sees zero affected rows.

use shared::models::{Appointment, AppointmentService, AppointmentStatus, AppointmentType, Service};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use super::{RepoError, RepoResult};
use crate::scheduling::lifecycle::LifecycleState;
use crate::scheduling::{DomainError, Interval, commission};
use crate::utils::time::MINUTE_MS;

const APPOINTMENT_COLUMNS: &str = "id, code, client_id, barber_id, appointment_type, status, start_at, end_at, duration_minutes, \
     total_amount, discount_amount, final_amount, client_notes, barber_notes, started_at, paused_at, resumed_at, \
     pause_reason, pause_duration_minutes, completed_at, active_duration_minutes, cancelled_at, cancelled_by, \
     cancellation_reason, rescheduled_from_id, rescheduled_to_id, created_at, updated_at";

/// Statuses that occupy the calendar, as a SQL list
const BLOCKING_STATUS_SQL: &str = "('pending', 'confirmed', 'in_progress')";

/// Attempts at drawing an unused id and public code
const CODE_ATTEMPTS: usize = 5;

/// Who the booking is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingClient {
    Existing(i64),
    /// Client profile of this user, created in the booking transaction if missing
    ForUser(i64),
}

/// Service line copied into `appointment_services`
#[derive(Debug, Clone, PartialEq)]
pub struct BookedService {
    pub service_id: i64,
    pub name: String,
    pub price: f64,
    pub duration_minutes: i64,
    pub supports_pause: bool,
}

impl From<&Service> for BookedService {
    fn from(s: &Service) -> Self {
        Self {
            service_id: s.id,
            name: s.name.clone(),
            price: s.price,
            duration_minutes: s.duration_minutes,
            supports_pause: s.supports_pause,
        }
    }
}

/// Rebooking keeps the original snapshot (prices included)
impl From<&AppointmentService> for BookedService {
    fn from(s: &AppointmentService) -> Self {
        Self {
            service_id: s.service_id,
            name: s.name.clone(),
            price: s.price,
            duration_minutes: s.duration_minutes,
            supports_pause: s.supports_pause,
        }
    }
}

/// Everything needed to insert a booking
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub client: BookingClient,
    pub barber_id: i64,
    pub appointment_type: AppointmentType,
    pub start_at: i64,
    pub services: Vec<BookedService>,
    pub notes: Option<String>,
    pub rescheduled_from_id: Option<i64>,
}

impl NewAppointment {
    pub fn duration_minutes(&self) -> i64 {
        self.services.iter().map(|s| s.duration_minutes).sum()
    }

    pub fn end_at(&self) -> i64 {
        self.start_at + self.duration_minutes() * MINUTE_MS
    }

    pub fn total_amount(&self) -> f64 {
        commission::sum(self.services.iter().map(|s| s.price))
    }
}

/// List filter; `barber_id`/`client_id` also carry the caller's scope
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub barber_id: Option<i64>,
    pub client_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub skip: i64,
    pub limit: i64,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Appointment>> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?");
    let appointment = sqlx::query_as::<_, Appointment>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match appointment {
        Some(a) => Ok(attach_services(pool, vec![a]).await?.pop()),
        None => Ok(None),
    }
}

/// Lookup by public code (normalized by the caller)
pub async fn find_by_code(pool: &SqlitePool, code: &str) -> RepoResult<Option<Appointment>> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE code = ?");
    let appointment = sqlx::query_as::<_, Appointment>(&sql)
        .bind(code)
        .fetch_optional(pool)
        .await?;
    match appointment {
        Some(a) => Ok(attach_services(pool, vec![a]).await?.pop()),
        None => Ok(None),
    }
}

pub async fn find_all(pool: &SqlitePool, filter: &AppointmentFilter) -> RepoResult<Vec<Appointment>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE 1 = 1"
    ));
    if let Some(barber_id) = filter.barber_id {
        qb.push(" AND barber_id = ").push_bind(barber_id);
    }
    if let Some(client_id) = filter.client_id {
        qb.push(" AND client_id = ").push_bind(client_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(from) = filter.from {
        qb.push(" AND start_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND start_at < ").push_bind(to);
    }
    qb.push(" ORDER BY start_at DESC LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(filter.skip);

    let appointments = qb.build_query_as::<Appointment>().fetch_all(pool).await?;
    attach_services(pool, appointments).await
}

/// Load the service snapshots for a batch of appointments
async fn attach_services(
    pool: &SqlitePool,
    mut appointments: Vec<Appointment>,
) -> RepoResult<Vec<Appointment>> {
    if appointments.is_empty() {
        return Ok(appointments);
    }
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT appointment_id, service_id, name, price, duration_minutes, supports_pause \
         FROM appointment_services WHERE appointment_id IN (",
    );
    let mut ids = qb.separated(", ");
    for a in &appointments {
        ids.push_bind(a.id);
    }
    qb.push(") ORDER BY rowid");

    let services = qb.build_query_as::<AppointmentService>().fetch_all(pool).await?;
    for a in &mut appointments {
        a.services = services
            .iter()
            .filter(|s| s.appointment_id == a.id)
            .cloned()
            .collect();
    }
    Ok(appointments)
}

/// Busy intervals for a barber inside `[from, to)`: blocking appointments and active blocks
pub async fn busy_intervals(
    pool: &SqlitePool,
    barber_id: i64,
    from: i64,
    to: i64,
) -> RepoResult<Vec<Interval>> {
    let sql = format!(
        "SELECT id, start_at, end_at FROM appointments \
         WHERE barber_id = ?1 AND status IN {BLOCKING_STATUS_SQL} AND start_at < ?3 AND ?2 < end_at \
         ORDER BY start_at"
    );
    let appointments: Vec<(i64, i64, i64)> = sqlx::query_as(&sql)
        .bind(barber_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

    let blocks: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT start_at, end_at FROM barber_blocks \
         WHERE barber_id = ?1 AND deleted_at IS NULL AND start_at < ?3 AND ?2 < end_at ORDER BY start_at",
    )
    .bind(barber_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(appointments
        .into_iter()
        .map(|(id, start, end)| Interval::appointment(id, start, end))
        .chain(blocks.into_iter().map(|(start, end)| Interval::new(start, end)))
        .collect())
}

/// Book a slot.
///
/// Fails with [`DomainError::SlotUnavailable`] when the interval overlaps a
/// blocking appointment or an active block of the barber.
pub async fn create(pool: &SqlitePool, data: &NewAppointment) -> RepoResult<Appointment> {
    let client_id = match data.client {
        BookingClient::Existing(id) => id,
        BookingClient::ForUser(user_id) => {
            let mut tx = pool.begin().await?;
            let id = super::client::ensure_for_user(&mut tx, user_id).await?;
            tx.commit().await?;
            id
        }
    };

    let mut tx = pool.begin().await?;
    let id = insert_in_tx(&mut tx, client_id, data).await?;
    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create appointment".into()))
}

/// Conditional insert; must be the first write of the transaction
async fn insert_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    client_id: i64,
    data: &NewAppointment,
) -> RepoResult<i64> {
    if data.services.is_empty() {
        return Err(RepoError::Validation("At least one service is required".into()));
    }
    let duration = data.duration_minutes();
    if duration <= 0 {
        return Err(RepoError::Validation("Appointment duration must be positive".into()));
    }
    let now = shared::util::now_millis();
    let end_at = data.end_at();
    let total = data.total_amount();

    let sql = format!(
        "INSERT INTO appointments (id, code, client_id, barber_id, appointment_type, status, start_at, end_at, \
         duration_minutes, total_amount, discount_amount, final_amount, client_notes, pause_duration_minutes, \
         rescheduled_from_id, created_at, updated_at) \
         SELECT ?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, ?9, 0, ?9, ?10, 0, ?11, ?12, ?12 \
         WHERE NOT EXISTS (SELECT 1 FROM appointments a WHERE a.barber_id = ?4 AND a.status IN {BLOCKING_STATUS_SQL} \
                           AND a.start_at < ?7 AND ?6 < a.end_at) \
           AND NOT EXISTS (SELECT 1 FROM barber_blocks b WHERE b.barber_id = ?4 AND b.deleted_at IS NULL \
                           AND b.start_at < ?7 AND ?6 < b.end_at)"
    );

    for _ in 0..CODE_ATTEMPTS {
        let id = shared::util::snowflake_id();
        let code = shared::util::appointment_code();
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(&code)
            .bind(client_id)
            .bind(data.barber_id)
            .bind(data.appointment_type)
            .bind(data.start_at)
            .bind(end_at)
            .bind(duration)
            .bind(total)
            .bind(&data.notes)
            .bind(data.rescheduled_from_id)
            .bind(now)
            .execute(&mut **tx)
            .await;
        match result {
            Ok(done) if done.rows_affected() == 0 => return Err(DomainError::SlotUnavailable.into()),
            Ok(_) => return insert_services(tx, id, &data.services).await.map(|_| id),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                tracing::debug!(code = %code, "Appointment id/code collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(RepoError::Database(
        "Could not allocate a unique appointment code".into(),
    ))
}

async fn insert_services(
    tx: &mut Transaction<'_, Sqlite>,
    appointment_id: i64,
    services: &[BookedService],
) -> RepoResult<()> {
    for service in services {
        sqlx::query(
            "INSERT INTO appointment_services (appointment_id, service_id, name, price, duration_minutes, supports_pause) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(appointment_id)
        .bind(service.service_id)
        .bind(&service.name)
        .bind(service.price)
        .bind(service.duration_minutes)
        .bind(service.supports_pause)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Changes of one appointment edit, written together or not at all
#[derive(Debug, Default)]
pub struct AppointmentEdit<'a> {
    /// New `(start_at, end_at)`, same barber
    pub schedule: Option<(i64, i64)>,
    /// Validated lifecycle state to store
    pub lifecycle: Option<LifecycleState>,
    pub client_notes: Option<&'a str>,
    pub barber_notes: Option<&'a str>,
}

/// Apply an edit in one transaction.
///
/// Every part is guarded by `expected_status`; a moved interval never
/// conflicts with the appointment's own old interval.
pub async fn edit(
    pool: &SqlitePool,
    id: i64,
    expected_status: AppointmentStatus,
    edit: &AppointmentEdit<'_>,
) -> RepoResult<Appointment> {
    let mut tx = pool.begin().await?;
    if let Some((start_at, end_at)) = edit.schedule {
        move_in_tx(&mut tx, id, expected_status, start_at, end_at).await?;
    }
    if let Some(state) = &edit.lifecycle {
        write_lifecycle(&mut tx, id, expected_status, state).await?;
    }
    if edit.client_notes.is_some() || edit.barber_notes.is_some() {
        notes_in_tx(&mut tx, id, edit.client_notes, edit.barber_notes).await?;
    }
    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Appointment {id} not found")))
}

async fn move_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    expected_status: AppointmentStatus,
    start_at: i64,
    end_at: i64,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE appointments SET start_at = ?1, end_at = ?2, updated_at = ?3 \
         WHERE id = ?4 AND status = ?5 \
           AND NOT EXISTS (SELECT 1 FROM appointments a WHERE a.barber_id = appointments.barber_id AND a.id <> ?4 \
                           AND a.status IN {BLOCKING_STATUS_SQL} AND a.start_at < ?2 AND ?1 < a.end_at) \
           AND NOT EXISTS (SELECT 1 FROM barber_blocks b WHERE b.barber_id = appointments.barber_id \
                           AND b.deleted_at IS NULL AND b.start_at < ?2 AND ?1 < b.end_at)"
    );
    let rows = sqlx::query(&sql)
        .bind(start_at)
        .bind(end_at)
        .bind(now)
        .bind(id)
        .bind(expected_status)
        .execute(&mut **tx)
        .await?;

    if rows.rows_affected() == 0 {
        let current: Option<AppointmentStatus> =
            sqlx::query_scalar("SELECT status FROM appointments WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;
        return Err(match current {
            None => RepoError::NotFound(format!("Appointment {id} not found")),
            Some(status) if status != expected_status => DomainError::ConcurrentModification.into(),
            Some(_) => DomainError::SlotUnavailable.into(),
        });
    }
    Ok(())
}

async fn notes_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    client_notes: Option<&str>,
    barber_notes: Option<&str>,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE appointments SET client_notes = COALESCE(?1, client_notes), barber_notes = COALESCE(?2, barber_notes), \
         updated_at = ?3 WHERE id = ?4",
    )
    .bind(client_notes)
    .bind(barber_notes)
    .bind(now)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Appointment {id} not found")));
    }
    Ok(())
}

/// Compare-and-set write of the lifecycle columns
async fn write_lifecycle(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    from: AppointmentStatus,
    state: &LifecycleState,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE appointments SET status = ?1, end_at = ?2, started_at = ?3, paused_at = ?4, resumed_at = ?5, \
         pause_reason = ?6, pause_duration_minutes = ?7, completed_at = ?8, active_duration_minutes = ?9, \
         cancelled_at = ?10, cancelled_by = ?11, cancellation_reason = ?12, updated_at = ?13 \
         WHERE id = ?14 AND status = ?15",
    )
    .bind(state.status)
    .bind(state.end_at)
    .bind(state.started_at)
    .bind(state.paused_at)
    .bind(state.resumed_at)
    .bind(&state.pause_reason)
    .bind(state.pause_duration_minutes)
    .bind(state.completed_at)
    .bind(state.active_duration_minutes)
    .bind(state.cancelled_at)
    .bind(state.cancelled_by)
    .bind(&state.cancellation_reason)
    .bind(now)
    .bind(id)
    .bind(from)
    .execute(&mut **tx)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(DomainError::ConcurrentModification.into());
    }
    Ok(())
}

/// Persist a validated transition; fails if the status changed since `from` was read
pub async fn apply_transition(
    pool: &SqlitePool,
    id: i64,
    from: AppointmentStatus,
    state: &LifecycleState,
) -> RepoResult<Appointment> {
    let mut tx = pool.begin().await?;
    write_lifecycle(&mut tx, id, from, state).await?;
    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Appointment {id} not found")))
}

/// Mark `old` as rescheduled and book its replacement atomically.
///
/// Returns `(previous, replacement)`. Nothing changes if the new slot is taken.
pub async fn reschedule(
    pool: &SqlitePool,
    old: &Appointment,
    state: &LifecycleState,
    replacement: &NewAppointment,
) -> RepoResult<(Appointment, Appointment)> {
    let mut tx = pool.begin().await?;
    // releasing the old slot first lets the replacement overlap it
    write_lifecycle(&mut tx, old.id, old.status, state).await?;
    let new_id = insert_in_tx(&mut tx, old.client_id, replacement).await?;
    sqlx::query("UPDATE appointments SET rescheduled_to_id = ? WHERE id = ?")
        .bind(new_id)
        .bind(old.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let previous = find_by_id(pool, old.id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Appointment {} not found", old.id)))?;
    let appointment = find_by_id(pool, new_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create appointment".into()))?;
    Ok((previous, appointment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::service;
    use crate::db::repository::test_support::{seed_barber, seed_client, seed_service, test_pool};
    use crate::scheduling::{LifecycleRules, Transition, apply};

    const M: i64 = MINUTE_MS;
    const T0: i64 = 1_753_092_000_000; // 2025-07-21 10:00 UTC

    async fn bookable(pool: &SqlitePool, ids: &[i64]) -> Vec<BookedService> {
        let mut booked = Vec::new();
        for &id in ids {
            let service = service::find_by_id(pool, id).await.unwrap().unwrap();
            booked.push(BookedService::from(&service));
        }
        booked
    }

    async fn booking(pool: &SqlitePool, barber_id: i64, client_id: i64, service_id: i64, start_at: i64) -> NewAppointment {
        NewAppointment {
            client: BookingClient::Existing(client_id),
            barber_id,
            appointment_type: AppointmentType::Regular,
            start_at,
            services: bookable(pool, &[service_id]).await,
            notes: None,
            rescheduled_from_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_snapshots_services_and_totals() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, None).await;
        let client = seed_client(&pool).await;
        let cut = seed_service(&pool, 30, 40.0, false).await;
        let beard = seed_service(&pool, 20, 25.5, false).await;

        let mut data = booking(&pool, barber, client, cut, T0).await;
        data.services = bookable(&pool, &[cut, beard]).await;
        let appt = create(&pool, &data).await.unwrap();

        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert_eq!(appt.duration_minutes, 50);
        assert_eq!(appt.end_at, T0 + 50 * M);
        assert_eq!(appt.total_amount, 65.5);
        assert_eq!(appt.final_amount, 65.5);
        assert_eq!(appt.services.len(), 2);
        assert_eq!(appt.code.len(), shared::util::APPOINTMENT_CODE_LEN);
        assert!(find_by_code(&pool, &appt.code).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overlapping_booking_is_rejected_adjacent_is_not() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, None).await;
        let client = seed_client(&pool).await;
        let cut = seed_service(&pool, 30, 40.0, false).await;

        create(&pool, &booking(&pool, barber, client, cut, T0 + 15 * M).await)
            .await
            .unwrap();

        let err = create(&pool, &booking(&pool, barber, client, cut, T0).await)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Domain(DomainError::SlotUnavailable)));

        // ends exactly when the existing one starts
        create(&pool, &booking(&pool, barber, client, cut, T0 - 15 * M).await)
            .await
            .unwrap();

        // another barber is unaffected
        let other = seed_barber(&pool, None).await;
        create(&pool, &booking(&pool, other, client, cut, T0).await)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_bookings_only_one_wins() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, None).await;
        let client = seed_client(&pool).await;
        let cut = seed_service(&pool, 30, 40.0, false).await;
        let data = booking(&pool, barber, client, cut, T0).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let data = data.clone();
            handles.push(tokio::spawn(async move { create(&pool, &data).await }));
        }
        let mut won = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => won += 1,
                Err(RepoError::Domain(DomainError::SlotUnavailable)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(won, 1);
    }

    #[tokio::test]
    async fn test_paused_appointment_frees_the_slot() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, None).await;
        let client = seed_client(&pool).await;
        let dye = seed_service(&pool, 60, 120.0, true).await;
        let cut = seed_service(&pool, 30, 40.0, false).await;
        let rules = LifecycleRules::default();

        let mut appt = create(&pool, &booking(&pool, barber, client, dye, T0).await)
            .await
            .unwrap();
        for t in [Transition::Confirm, Transition::Start, Transition::Pause { reason: None }] {
            let state = apply(&appt, &t, T0, &rules).unwrap();
            appt = apply_transition(&pool, appt.id, appt.status, &state).await.unwrap();
        }
        assert_eq!(appt.status, AppointmentStatus::Paused);

        create(&pool, &booking(&pool, barber, client, cut, T0 + 15 * M).await)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_which_statuses_hold_the_slot() {
        use AppointmentStatus::*;
        let (pool, _dir) = test_pool().await;
        let client = seed_client(&pool).await;
        let cut = seed_service(&pool, 30, 40.0, false).await;
        let existing_at = T0 + 15 * M;

        for status in [Pending, Confirmed, InProgress, Paused, Completed, Cancelled, NoShow, Rescheduled] {
            let barber = seed_barber(&pool, None).await;
            let appt = create(&pool, &booking(&pool, barber, client, cut, existing_at).await)
                .await
                .unwrap();
            sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
                .bind(status)
                .bind(appt.id)
                .execute(&pool)
                .await
                .unwrap();

            let busy = busy_intervals(&pool, barber, T0, T0 + 60 * M).await.unwrap();
            let result = create(&pool, &booking(&pool, barber, client, cut, T0).await).await;
            if status.blocks_calendar() {
                assert_eq!(busy.len(), 1, "{status}");
                assert_eq!(busy[0].appointment_id, Some(appt.id));
                assert!(
                    matches!(result, Err(RepoError::Domain(DomainError::SlotUnavailable))),
                    "{status} must hold 10:15-10:45 against 10:00-10:30"
                );
            } else {
                assert!(busy.is_empty(), "{status}");
                assert!(result.is_ok(), "{status} must free the slot");
            }
        }
    }

    #[tokio::test]
    async fn test_stale_transition_is_rejected() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, None).await;
        let client = seed_client(&pool).await;
        let cut = seed_service(&pool, 30, 40.0, false).await;
        let rules = LifecycleRules::default();

        let appt = create(&pool, &booking(&pool, barber, client, cut, T0).await)
            .await
            .unwrap();
        let confirm = apply(&appt, &Transition::Confirm, T0 - 600 * M, &rules).unwrap();
        apply_transition(&pool, appt.id, appt.status, &confirm).await.unwrap();

        // second writer still holds the PENDING snapshot
        let err = apply_transition(&pool, appt.id, appt.status, &confirm)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Domain(DomainError::ConcurrentModification)));
    }

    #[tokio::test]
    async fn test_move_ignores_itself() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, None).await;
        let client = seed_client(&pool).await;
        let cut = seed_service(&pool, 30, 40.0, false).await;

        let appt = create(&pool, &booking(&pool, barber, client, cut, T0).await)
            .await
            .unwrap();
        let other = create(&pool, &booking(&pool, barber, client, cut, T0 + 60 * M).await)
            .await
            .unwrap();

        // overlaps only its own old interval
        let moved = edit(
            &pool,
            appt.id,
            appt.status,
            &AppointmentEdit {
                schedule: Some((T0 + 15 * M, T0 + 45 * M)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.start_at, T0 + 15 * M);

        let err = edit(
            &pool,
            appt.id,
            appt.status,
            &AppointmentEdit {
                schedule: Some((other.start_at, other.end_at)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Domain(DomainError::SlotUnavailable)));
    }

    #[tokio::test]
    async fn test_failed_edit_keeps_the_old_interval() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, None).await;
        let client = seed_client(&pool).await;
        let cut = seed_service(&pool, 30, 40.0, false).await;

        let appt = create(&pool, &booking(&pool, barber, client, cut, T0).await)
            .await
            .unwrap();
        let confirmed = apply(&appt, &Transition::Confirm, T0 - 600 * M, &LifecycleRules::default()).unwrap();
        // someone else confirms first; the move in the same edit must not stick
        apply_transition(&pool, appt.id, appt.status, &confirmed).await.unwrap();

        let err = edit(
            &pool,
            appt.id,
            AppointmentStatus::Pending,
            &AppointmentEdit {
                schedule: Some((T0 + 120 * M, T0 + 150 * M)),
                lifecycle: Some(confirmed),
                client_notes: Some("x"),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Domain(DomainError::ConcurrentModification)));

        let current = find_by_id(&pool, appt.id).await.unwrap().unwrap();
        assert_eq!(current.start_at, T0);
        assert_eq!(current.client_notes, None);
    }

    #[tokio::test]
    async fn test_reschedule_links_both_rows() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, None).await;
        let client = seed_client(&pool).await;
        let cut = seed_service(&pool, 30, 40.0, false).await;
        let rules = LifecycleRules::default();

        let old = create(&pool, &booking(&pool, barber, client, cut, T0).await)
            .await
            .unwrap();
        let state = apply(&old, &Transition::Reschedule, T0 - 600 * M, &rules).unwrap();
        let mut replacement = booking(&pool, barber, client, cut, T0 + 10 * M).await;
        replacement.rescheduled_from_id = Some(old.id);

        let (previous, new) = reschedule(&pool, &old, &state, &replacement).await.unwrap();
        assert_eq!(previous.status, AppointmentStatus::Rescheduled);
        assert_eq!(previous.rescheduled_to_id, Some(new.id));
        assert_eq!(new.rescheduled_from_id, Some(old.id));
        assert_eq!(new.status, AppointmentStatus::Pending);
    }

    #[tokio::test]
    async fn test_busy_intervals_include_blocks() {
        let (pool, _dir) = test_pool().await;
        let barber = seed_barber(&pool, None).await;
        let client = seed_client(&pool).await;
        let cut = seed_service(&pool, 30, 40.0, false).await;
        let appt = create(&pool, &booking(&pool, barber, client, cut, T0).await)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO barber_blocks (id, barber_id, block_date, all_day, start_at, end_at, created_at, updated_at) \
             VALUES (1, ?, '2025-07-21', 0, ?, ?, 0, 0)",
        )
        .bind(barber)
        .bind(T0 + 120 * M)
        .bind(T0 + 180 * M)
        .execute(&pool)
        .await
        .unwrap();

        let busy = busy_intervals(&pool, barber, T0 - 600 * M, T0 + 600 * M).await.unwrap();
        assert_eq!(busy.len(), 2);
        assert_eq!(busy[0].appointment_id, Some(appt.id));
        assert_eq!(busy[1].appointment_id, None);

        // a booking inside the block is refused
        let err = create(&pool, &booking(&pool, barber, client, cut, T0 + 150 * M).await)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Domain(DomainError::SlotUnavailable)));
    }
}
