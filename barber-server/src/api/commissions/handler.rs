//! Commission API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Datelike;
use serde::Deserialize;
use shared::ErrorCode;
use shared::models::{
    AutoGenerateResult, Commission, CommissionCalculation, CommissionCreate, CommissionSummary,
    CommissionType, ShopCommissionSummary,
};

use crate::auth::{Action, Actor, Policy, Target};
use crate::core::ServerState;
use crate::db::repository::commission::{self, CommissionSource, NewCommission};
use crate::db::repository::{barber, paging};
use crate::scheduling::{DomainError, calculate};
use crate::utils::time::{local_date, parse_date};
use crate::utils::validation::{MAX_NOTE_LEN, validate_amount, validate_optional_text};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct CalculateQuery {
    pub appointment_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

async fn load_source(state: &ServerState, appointment_id: i64) -> AppResult<CommissionSource> {
    commission::find_source(&state.pool, appointment_id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::AppointmentNotFound,
                format!("Appointment {} not found", appointment_id),
            )
        })
}

async fn barber_name(state: &ServerState, barber_id: i64) -> AppResult<String> {
    barber::find_by_id(&state.pool, barber_id)
        .await?
        .map(|b| b.name)
        .ok_or_else(|| AppError::with_message(ErrorCode::BarberNotFound, "Barber not found"))
}

fn today(state: &ServerState) -> chrono::NaiveDate {
    local_date(shared::util::now_millis(), state.config.timezone)
}

/// POST /api/v1/commissions/calculate-appointment?appointment_id= - 预览，不落库
pub async fn calculate_appointment(
    State(state): State<ServerState>,
    actor: Actor,
    Query(query): Query<CalculateQuery>,
) -> AppResult<Json<CommissionCalculation>> {
    let source = load_source(&state, query.appointment_id).await?;
    Policy::authorize(&actor, Action::CommissionRead, Target::Barber(source.barber_id))?;

    let amount = commission::from_source(
        &source,
        state.config.default_service_commission_rate,
        state.config.timezone,
    )?
    .amount;

    Ok(Json(CommissionCalculation {
        appointment_id: source.appointment_id,
        barber_id: source.barber_id,
        base_amount: amount.base_amount,
        rate: amount.rate,
        amount: amount.amount,
        percentage: amount.percentage,
        already_generated: source.has_commission,
    }))
}

/// POST /api/v1/commissions/create
///
/// Service commissions derive from a completed appointment of the same
/// barber; product commissions take `base_amount` and an optional
/// `percentage` (0-100).
pub async fn create(
    State(state): State<ServerState>,
    actor: Actor,
    Json(payload): Json<CommissionCreate>,
) -> AppResult<(StatusCode, Json<Commission>)> {
    Policy::authorize(&actor, Action::CommissionManage, Target::Barber(payload.barber_id))?;
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;
    barber_name(&state, payload.barber_id).await?;

    let data = match payload.commission_type {
        CommissionType::Service => {
            let appointment_id = payload.appointment_id.ok_or_else(|| {
                AppError::validation("appointment_id is required for service commissions")
            })?;
            let source = load_source(&state, appointment_id).await?;
            if source.barber_id != payload.barber_id {
                return Err(AppError::validation(
                    "Appointment belongs to a different barber",
                ));
            }
            let mut data = commission::from_source(
                &source,
                state.config.default_service_commission_rate,
                state.config.timezone,
            )?;
            if payload.description.is_some() {
                data.description = payload.description;
            }
            data
        }
        CommissionType::Product => {
            let base_amount = payload.base_amount.ok_or_else(|| {
                AppError::validation("base_amount is required for product commissions")
            })?;
            validate_amount(base_amount, "base_amount")?;
            let rate = payload.percentage.map(|p| p / 100.0);
            NewCommission {
                barber_id: payload.barber_id,
                appointment_id: None,
                commission_type: CommissionType::Product,
                amount: calculate(
                    base_amount,
                    rate,
                    state.config.default_product_commission_rate,
                )?,
                description: payload.description,
                commission_date: today(&state),
            }
        }
    };

    let created = commission::create(&state.pool, &data).await?;
    tracing::info!(
        commission_id = created.id,
        barber_id = created.barber_id,
        commission_type = ?created.commission_type,
        amount = created.amount,
        operator = actor.user_id,
        "Commission created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/commissions/barber/:id?date_from=&date_to=
pub async fn list_by_barber(
    State(state): State<ServerState>,
    actor: Actor,
    Path(barber_id): Path<i64>,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<Vec<Commission>>> {
    Policy::authorize(&actor, Action::CommissionRead, Target::Barber(barber_id))?;
    let from = query.date_from.as_deref().map(parse_date).transpose()?;
    let to = query.date_to.as_deref().map(parse_date).transpose()?;
    let commissions = commission::find_by_barber(&state.pool, barber_id, from, to).await?;
    Ok(Json(commissions))
}

/// GET /api/v1/commissions/barber/:id/summary
pub async fn barber_summary(
    State(state): State<ServerState>,
    actor: Actor,
    Path(barber_id): Path<i64>,
) -> AppResult<Json<CommissionSummary>> {
    Policy::authorize(&actor, Action::CommissionRead, Target::Barber(barber_id))?;
    let name = barber_name(&state, barber_id).await?;
    let summary = commission::summary(&state.pool, barber_id, name, today(&state)).await?;
    Ok(Json(summary))
}

/// GET /api/v1/commissions/all
pub async fn list_all(
    State(state): State<ServerState>,
    actor: Actor,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<Commission>>> {
    Policy::authorize(&actor, Action::CommissionRead, Target::Any)?;
    let (skip, limit) = paging(query.skip, query.limit);
    Ok(Json(commission::find_all(&state.pool, skip, limit).await?))
}

/// GET /api/v1/commissions/summary?date_from=&date_to= - 全店汇总
///
/// Defaults to the current month up to today.
pub async fn shop_summary(
    State(state): State<ServerState>,
    actor: Actor,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<ShopCommissionSummary>> {
    Policy::authorize(&actor, Action::CommissionRead, Target::Any)?;
    let to = match query.date_to.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => today(&state),
    };
    let from = match query.date_from.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => to.with_day(1).unwrap_or(to),
    };
    if from > to {
        return Err(AppError::validation("date_from must not be after date_to"));
    }
    Ok(Json(commission::shop_summary(&state.pool, from, to).await?))
}

/// POST /api/v1/commissions/auto-generate - 可重复执行
pub async fn auto_generate(
    State(state): State<ServerState>,
    actor: Actor,
) -> AppResult<Json<AutoGenerateResult>> {
    Policy::authorize(&actor, Action::CommissionManage, Target::Any)?;
    let result = commission::auto_generate(
        &state.pool,
        state.config.default_service_commission_rate,
        state.config.timezone,
    )
    .await?;
    tracing::info!(
        generated = result.generated_count,
        total = result.total_amount,
        operator = actor.user_id,
        "Commissions auto-generated"
    );
    Ok(Json(result))
}

/// POST /api/v1/commissions/generate-for-appointment/:id
pub async fn generate_for_appointment(
    State(state): State<ServerState>,
    actor: Actor,
    Path(appointment_id): Path<i64>,
) -> AppResult<(StatusCode, Json<Commission>)> {
    let source = load_source(&state, appointment_id).await?;
    Policy::authorize(&actor, Action::CommissionManage, Target::Barber(source.barber_id))?;
    if source.has_commission {
        return Err(DomainError::CommissionExists.into());
    }

    let data = commission::from_source(
        &source,
        state.config.default_service_commission_rate,
        state.config.timezone,
    )?;
    let created = commission::create(&state.pool, &data).await?;
    tracing::info!(
        commission_id = created.id,
        appointment_id,
        amount = created.amount,
        operator = actor.user_id,
        "Commission generated"
    );
    Ok((StatusCode::CREATED, Json(created)))
}
