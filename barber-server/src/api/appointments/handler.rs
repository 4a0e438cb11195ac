//! Appointment API Handlers
//!
//! Handlers load the snapshot, authorize against it, run the pure
//! scheduling rules and hand the result to the repository, whose writes
//! re-check slot and status atomically.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::ErrorCode;
use shared::models::{
    Appointment, AppointmentCreate, AppointmentLookup, AppointmentStatus, AppointmentUpdate,
    AvailabilityResponse, ReasonBody, RescheduleRequest, RescheduleResult, Role, StatusChange,
};

use crate::auth::{Action, Actor, AppointmentScope, Policy, Target};
use crate::core::ServerState;
use crate::db::repository::appointment::{
    self, AppointmentEdit, AppointmentFilter, BookedService, BookingClient, NewAppointment,
};
use crate::db::repository::{barber, client, paging, service};
use crate::scheduling::lifecycle::{self, Transition};
use crate::scheduling::{DomainError, slot_grid};
use crate::utils::time::{
    MINUTE_MS, day_end_millis, day_start_millis, format_local, parse_date, parse_start_time,
};
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub barber_id: Option<i64>,
    pub client_id: Option<i64>,
    /// Local date, inclusive
    pub date_from: Option<String>,
    /// Local date, inclusive
    pub date_to: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub barber_id: i64,
    /// `YYYY-MM-DD`
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelQuery {
    pub reason: Option<String>,
}

fn target(appt: &Appointment) -> Target {
    Target::Appointment {
        barber_id: appt.barber_id,
        client_id: appt.client_id,
    }
}

/// Capability a transition needs
fn action_for(transition: &Transition) -> Action {
    match transition {
        Transition::Cancel { .. } => Action::AppointmentCancel,
        Transition::Reschedule => Action::AppointmentUpdate,
        _ => Action::AppointmentStatus,
    }
}

fn parse_status(raw: &str) -> AppResult<AppointmentStatus> {
    raw.parse::<AppointmentStatus>()
        .map_err(AppError::validation)
}

async fn load(state: &ServerState, id: i64) -> AppResult<Appointment> {
    appointment::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::AppointmentNotFound,
                format!("Appointment {} not found", id),
            )
        })
}

/// Barber that can take new bookings
async fn bookable_barber(state: &ServerState, barber_id: i64) -> AppResult<shared::models::Barber> {
    let b = barber::find_by_id(&state.pool, barber_id)
        .await?
        .ok_or_else(|| AppError::with_message(ErrorCode::BarberNotFound, "Barber not found"))?;
    if !b.is_available {
        return Err(AppError::with_message(
            ErrorCode::BarberUnavailable,
            format!("Barber {} is not taking bookings", b.name),
        ));
    }
    Ok(b)
}

/// Load the requested services in request order; each must be active and listed once
async fn bookable_services(state: &ServerState, ids: &[i64]) -> AppResult<Vec<shared::models::Service>> {
    let mut services: Vec<shared::models::Service> = Vec::with_capacity(ids.len());
    for &id in ids {
        if services.iter().any(|s| s.id == id) {
            return Err(AppError::validation(format!("Service {id} is listed more than once")));
        }
        let service = service::find_by_id(&state.pool, id).await?.ok_or_else(|| {
            AppError::with_message(ErrorCode::ServiceNotFound, format!("Service {id} not found"))
        })?;
        if !service.is_active {
            return Err(AppError::with_message(
                ErrorCode::ServiceInactive,
                format!("Service {} is not available for booking", service.name),
            ));
        }
        services.push(service);
    }
    Ok(services)
}

/// Validate and persist one lifecycle transition
async fn run_transition(
    state: &ServerState,
    actor: &Actor,
    id: i64,
    make: impl FnOnce(&Appointment) -> Result<Transition, DomainError>,
) -> AppResult<Appointment> {
    let appt = load(state, id).await?;
    let transition = make(&appt)?;
    Policy::authorize(actor, action_for(&transition), target(&appt))?;

    let now = shared::util::now_millis();
    let next = lifecycle::apply(&appt, &transition, now, &state.config.lifecycle_rules())?;
    let updated = appointment::apply_transition(&state.pool, id, appt.status, &next).await?;

    tracing::info!(
        appointment_id = id,
        from = %appt.status,
        to = %updated.status,
        operator = actor.user_id,
        "Appointment status changed"
    );
    Ok(updated)
}

/// POST /api/v1/appointments - 创建预约
///
/// Clients book for themselves (their client profile is created on first
/// booking); staff must pass `client_id`.
pub async fn create(
    State(state): State<ServerState>,
    actor: Actor,
    Json(payload): Json<AppointmentCreate>,
) -> AppResult<(StatusCode, Json<Appointment>)> {
    validate_optional_text(&payload.notes, "notes", MAX_NOTE_LEN)?;
    if payload.service_ids.is_empty() {
        return Err(AppError::validation("At least one service is required"));
    }

    let booking_client = match (payload.client_id, actor.client_id) {
        (Some(client_id), _) => {
            Policy::authorize(
                &actor,
                Action::AppointmentCreate,
                Target::Appointment {
                    barber_id: payload.barber_id,
                    client_id,
                },
            )?;
            client::find_by_id(&state.pool, client_id)
                .await?
                .ok_or_else(|| {
                    AppError::with_message(ErrorCode::ClientNotFound, "Client not found")
                })?;
            BookingClient::Existing(client_id)
        }
        (None, Some(own)) if actor.role == Role::Client => {
            Policy::authorize(&actor, Action::AppointmentCreate, Target::Client(own))?;
            BookingClient::Existing(own)
        }
        (None, _) => {
            Policy::authorize(&actor, Action::AppointmentCreate, Target::OwnClientProfile)?;
            if actor.role != Role::Client {
                return Err(AppError::validation("client_id is required"));
            }
            BookingClient::ForUser(actor.user_id)
        }
    };

    bookable_barber(&state, payload.barber_id).await?;
    let services = bookable_services(&state, &payload.service_ids).await?;
    let start_at = parse_start_time(&payload.start_time, state.config.timezone)?;

    let appt = appointment::create(
        &state.pool,
        &NewAppointment {
            client: booking_client,
            barber_id: payload.barber_id,
            appointment_type: payload.appointment_type,
            start_at,
            services: services.iter().map(BookedService::from).collect(),
            notes: payload.notes,
            rescheduled_from_id: None,
        },
    )
    .await?;

    tracing::info!(
        appointment_id = appt.id,
        code = %appt.code,
        barber_id = appt.barber_id,
        client_id = appt.client_id,
        operator = actor.user_id,
        "Appointment booked"
    );
    Ok((StatusCode::CREATED, Json(appt)))
}

/// GET /api/v1/appointments - 按角色限定范围的列表
pub async fn list(
    State(state): State<ServerState>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Appointment>>> {
    let tz = state.config.timezone;
    let (skip, limit) = paging(query.skip, query.limit);
    let mut filter = AppointmentFilter {
        barber_id: query.barber_id,
        client_id: query.client_id,
        status: query.status.as_deref().map(parse_status).transpose()?,
        from: query
            .date_from
            .as_deref()
            .map(parse_date)
            .transpose()?
            .map(|d| day_start_millis(d, tz)),
        to: query
            .date_to
            .as_deref()
            .map(parse_date)
            .transpose()?
            .map(|d| day_end_millis(d, tz)),
        skip,
        limit,
    };

    match Policy::appointment_scope(&actor)? {
        AppointmentScope::All => {}
        AppointmentScope::Barber(id) => filter.barber_id = Some(id),
        AppointmentScope::Client(id) => filter.client_id = Some(id),
    }

    Ok(Json(appointment::find_all(&state.pool, &filter).await?))
}

/// GET /api/v1/appointments/my-appointments
pub async fn my_appointments(
    State(state): State<ServerState>,
    actor: Actor,
) -> AppResult<Json<Vec<Appointment>>> {
    let (skip, limit) = paging(None, None);
    let mut filter = AppointmentFilter {
        skip,
        limit,
        ..Default::default()
    };
    if let Some(id) = actor.client_id {
        filter.client_id = Some(id);
    } else if let Some(id) = actor.barber_id {
        filter.barber_id = Some(id);
    } else {
        // no linked profile: nothing booked yet
        return Ok(Json(Vec::new()));
    }
    Ok(Json(appointment::find_all(&state.pool, &filter).await?))
}

/// GET /api/v1/appointments/availability?barber_id=&date=
pub async fn availability(
    State(state): State<ServerState>,
    actor: Actor,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<AvailabilityResponse>> {
    Policy::authorize(&actor, Action::BarberRead, Target::Barber(query.barber_id))?;
    let config = &state.config;
    let date = parse_date(&query.date)?;
    let b = barber::find_by_id(&state.pool, query.barber_id)
        .await?
        .ok_or_else(|| AppError::with_message(ErrorCode::BarberNotFound, "Barber not found"))?;

    let busy = appointment::busy_intervals(
        &state.pool,
        b.id,
        day_start_millis(date, config.timezone),
        day_end_millis(date, config.timezone),
    )
    .await?;
    let slots = slot_grid(
        date,
        config.timezone,
        config.opening_time,
        config.closing_time,
        config.slot_minutes,
        &busy,
    );

    Ok(Json(AvailabilityResponse {
        barber_id: b.id,
        barber_name: b.name,
        date: date.to_string(),
        slot_minutes: config.slot_minutes,
        slots,
    }))
}

/// GET /api/v1/appointments/by-code/:code - 公开查询
pub async fn get_by_code(
    State(state): State<ServerState>,
    Path(code): Path<String>,
) -> AppResult<Json<AppointmentLookup>> {
    let code = shared::util::normalize_code(&code);
    let appt = appointment::find_by_code(&state.pool, &code)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::AppointmentNotFound,
                "Appointment not found. Check the code and try again.",
            )
        })?;

    let barber_name = barber::find_by_id(&state.pool, appt.barber_id)
        .await?
        .map(|b| b.name)
        .unwrap_or_else(|| "Unknown".to_string());
    let client_name = client::find_by_id(&state.pool, appt.client_id)
        .await?
        .map(|c| c.name)
        .unwrap_or_else(|| "Unknown".to_string());

    let rules = state.config.lifecycle_rules();
    let can_cancel = matches!(
        appt.status,
        AppointmentStatus::Pending | AppointmentStatus::Confirmed
    ) && lifecycle::within_change_window(&appt, shared::util::now_millis(), &rules);

    Ok(Json(AppointmentLookup {
        id: appt.id,
        code: appt.code,
        status: appt.status,
        client_name,
        barber_name,
        start_at: appt.start_at,
        formatted_date: format_local(appt.start_at, state.config.timezone, "%d/%m/%Y %H:%M"),
        duration_minutes: appt.duration_minutes,
        total_amount: appt.total_amount,
        notes: appt.client_notes,
        can_cancel,
        created_at: appt.created_at,
    }))
}

/// GET /api/v1/appointments/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Appointment>> {
    let appt = load(&state, id).await?;
    Policy::authorize(&actor, Action::AppointmentRead, target(&appt))?;
    Ok(Json(appt))
}

/// PUT /api/v1/appointments/:id - 部分更新
///
/// `start_time` moves the booking (same barber, same duration) under the
/// slot check; `status` goes through the state machine, evaluated at the
/// new time. Everything is written in one transaction.
pub async fn update(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<AppointmentUpdate>,
) -> AppResult<Json<Appointment>> {
    validate_optional_text(&payload.notes, "notes", MAX_NOTE_LEN)?;
    validate_optional_text(&payload.barber_notes, "barber_notes", MAX_NOTE_LEN)?;

    let appt = load(&state, id).await?;
    Policy::authorize(&actor, Action::AppointmentUpdate, target(&appt))?;
    if payload.barber_notes.is_some() && actor.role == Role::Client {
        return Err(AppError::forbidden("Clients cannot edit barber notes"));
    }

    let rules = state.config.lifecycle_rules();
    let now = shared::util::now_millis();
    // checks run on the moved snapshot; nothing is written until all pass
    let mut snapshot = appt.clone();
    let mut edit = AppointmentEdit {
        client_notes: payload.notes.as_deref(),
        barber_notes: payload.barber_notes.as_deref(),
        ..Default::default()
    };

    if let Some(raw) = &payload.start_time {
        let start_at = parse_start_time(raw, state.config.timezone)?;
        if !matches!(
            appt.status,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        ) {
            return Err(DomainError::InvalidTransition {
                from: appt.status,
                action: "move",
            }
            .into());
        }
        if !actor.is_staff() && !lifecycle::within_change_window(&appt, now, &rules) {
            return Err(DomainError::CancellationWindowClosed {
                lead_minutes: rules.cancellation_lead_minutes,
            }
            .into());
        }
        snapshot.start_at = start_at;
        snapshot.end_at = start_at + appt.duration_minutes * MINUTE_MS;
        edit.schedule = Some((snapshot.start_at, snapshot.end_at));
    }

    if let Some(raw) = &payload.status {
        let target_status = parse_status(raw)?;
        if target_status != appt.status {
            let transition =
                Transition::to_status(appt.status, target_status, actor.user_id, None)?;
            Policy::authorize(&actor, action_for(&transition), target(&appt))?;
            edit.lifecycle = Some(lifecycle::apply(&snapshot, &transition, now, &rules)?);
        }
    }

    let updated = appointment::edit(&state.pool, id, appt.status, &edit).await?;
    tracing::info!(
        appointment_id = id,
        from = %appt.status,
        to = %updated.status,
        start_at = updated.start_at,
        operator = actor.user_id,
        "Appointment updated"
    );
    Ok(Json(updated))
}

/// DELETE /api/v1/appointments/:id?reason= - 取消 (软删除)
pub async fn cancel(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
    Query(query): Query<CancelQuery>,
) -> AppResult<Json<Appointment>> {
    validate_optional_text(&query.reason, "reason", MAX_NOTE_LEN)?;
    let user_id = actor.user_id;
    let appt = run_transition(&state, &actor, id, |_| {
        Ok(Transition::Cancel {
            actor: user_id,
            reason: query.reason,
        })
    })
    .await?;
    Ok(Json(appt))
}

/// PUT /api/v1/appointments/:id/status-simple
pub async fn status_simple(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<StatusChange>,
) -> AppResult<Json<Appointment>> {
    validate_optional_text(&payload.reason, "reason", MAX_NOTE_LEN)?;
    let target_status = parse_status(&payload.status)?;
    let user_id = actor.user_id;
    let appt = run_transition(&state, &actor, id, |a| {
        Transition::to_status(a.status, target_status, user_id, payload.reason)
    })
    .await?;
    Ok(Json(appt))
}

/// POST /api/v1/appointments/:id/confirm
pub async fn confirm(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Appointment>> {
    Ok(Json(
        run_transition(&state, &actor, id, |_| Ok(Transition::Confirm)).await?,
    ))
}

/// POST /api/v1/appointments/:id/start
pub async fn start(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Appointment>> {
    Ok(Json(
        run_transition(&state, &actor, id, |_| Ok(Transition::Start)).await?,
    ))
}

/// POST /api/v1/appointments/:id/pause - body `{ "reason": ... }` optional
pub async fn pause(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
    body: Option<Json<ReasonBody>>,
) -> AppResult<Json<Appointment>> {
    let reason = body.and_then(|Json(b)| b.reason);
    validate_optional_text(&reason, "reason", MAX_NOTE_LEN)?;
    Ok(Json(
        run_transition(&state, &actor, id, |_| Ok(Transition::Pause { reason })).await?,
    ))
}

/// POST /api/v1/appointments/:id/resume
pub async fn resume(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Appointment>> {
    Ok(Json(
        run_transition(&state, &actor, id, |_| Ok(Transition::Resume)).await?,
    ))
}

/// POST /api/v1/appointments/:id/complete
pub async fn complete(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Appointment>> {
    Ok(Json(
        run_transition(&state, &actor, id, |_| Ok(Transition::Complete)).await?,
    ))
}

/// POST /api/v1/appointments/:id/no-show
pub async fn no_show(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Appointment>> {
    Ok(Json(
        run_transition(&state, &actor, id, |_| Ok(Transition::NoShow)).await?,
    ))
}

/// POST /api/v1/appointments/:id/reschedule - 改期
///
/// The old booking becomes `rescheduled` and a linked replacement is booked
/// in the same transaction, keeping the original service snapshot.
pub async fn reschedule(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<RescheduleRequest>,
) -> AppResult<(StatusCode, Json<RescheduleResult>)> {
    let old = load(&state, id).await?;
    Policy::authorize(&actor, Action::AppointmentUpdate, target(&old))?;

    let barber_id = payload.barber_id.unwrap_or(old.barber_id);
    if barber_id != old.barber_id {
        bookable_barber(&state, barber_id).await?;
    }
    let start_at = parse_start_time(&payload.start_time, state.config.timezone)?;

    let now = shared::util::now_millis();
    let next = lifecycle::apply(
        &old,
        &Transition::Reschedule,
        now,
        &state.config.lifecycle_rules(),
    )?;
    let replacement = NewAppointment {
        client: BookingClient::Existing(old.client_id),
        barber_id,
        appointment_type: old.appointment_type,
        start_at,
        services: old.services.iter().map(BookedService::from).collect(),
        notes: old.client_notes.clone(),
        rescheduled_from_id: Some(old.id),
    };

    let (previous, appointment) =
        appointment::reschedule(&state.pool, &old, &next, &replacement).await?;
    tracing::info!(
        appointment_id = previous.id,
        replacement_id = appointment.id,
        operator = actor.user_id,
        "Appointment rescheduled"
    );
    Ok((
        StatusCode::CREATED,
        Json(RescheduleResult {
            previous,
            appointment,
        }),
    ))
}
