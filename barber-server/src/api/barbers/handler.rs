//! Barber API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::auth::{Action, Actor, Policy, Target};
use crate::core::ServerState;
use crate::db::repository::barber;
use crate::utils::validation::{
    MAX_EMAIL_LEN, MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text, validate_rate,
    validate_required_text,
};
use crate::utils::{AppError, AppResult};
use shared::models::{Barber, BarberCreate, BarberUpdate};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub available_only: bool,
}

/// GET /api/v1/barbers
pub async fn list(
    State(state): State<ServerState>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Barber>>> {
    Policy::authorize(&actor, Action::BarberRead, Target::Any)?;
    let barbers = barber::find_all(&state.pool, query.available_only).await?;
    Ok(Json(barbers))
}

/// GET /api/v1/barbers/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Barber>> {
    Policy::authorize(&actor, Action::BarberRead, Target::Barber(id))?;
    let b = barber::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Barber {}", id)))?;
    Ok(Json(b))
}

/// POST /api/v1/barbers
pub async fn create(
    State(state): State<ServerState>,
    actor: Actor,
    Json(payload): Json<BarberCreate>,
) -> AppResult<(StatusCode, Json<Barber>)> {
    Policy::authorize(&actor, Action::BarberManage, Target::Any)?;
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.email, "email", MAX_EMAIL_LEN)?;
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.specialties, "specialties", MAX_SHORT_TEXT_LEN)?;
    if let Some(rate) = payload.commission_rate {
        validate_rate(rate, "commission_rate")?;
    }

    let b = barber::create(&state.pool, payload).await?;
    tracing::info!(barber_id = b.id, operator = actor.user_id, "Barber created");
    Ok((StatusCode::CREATED, Json(b)))
}

/// PUT /api/v1/barbers/:id
pub async fn update(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<BarberUpdate>,
) -> AppResult<Json<Barber>> {
    Policy::authorize(&actor, Action::BarberManage, Target::Barber(id))?;
    if let Some(name) = &payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    if let Some(rate) = payload.commission_rate {
        validate_rate(rate, "commission_rate")?;
    }

    let b = barber::update(&state.pool, id, payload).await?;
    Ok(Json(b))
}

/// DELETE /api/v1/barbers/:id - 软删除
pub async fn delete(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    Policy::authorize(&actor, Action::BarberManage, Target::Barber(id))?;
    barber::soft_delete(&state.pool, id).await?;
    tracing::info!(barber_id = id, operator = actor.user_id, "Barber deleted");
    Ok(StatusCode::NO_CONTENT)
}
