//! Service API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::auth::{Action, Actor, Policy, Target};
use crate::core::ServerState;
use crate::db::repository::service;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, validate_amount, validate_optional_text, validate_required_text,
};
use crate::utils::{AppError, AppResult};
use shared::models::{Service, ServiceCreate, ServiceUpdate};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Include deactivated services (staff only)
    #[serde(default)]
    pub include_inactive: bool,
}

fn validate_duration(minutes: i64) -> AppResult<()> {
    if minutes <= 0 {
        return Err(AppError::validation(format!(
            "duration_minutes must be positive, got {minutes}"
        )));
    }
    Ok(())
}

/// GET /api/v1/services
pub async fn list(
    State(state): State<ServerState>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Service>>> {
    Policy::authorize(&actor, Action::ServiceRead, Target::Any)?;
    let active_only = !(query.include_inactive && actor.is_staff());
    let services = service::find_all(&state.pool, active_only).await?;
    Ok(Json(services))
}

/// GET /api/v1/services/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Service>> {
    Policy::authorize(&actor, Action::ServiceRead, Target::Any)?;
    let s = service::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Service {}", id)))?;
    Ok(Json(s))
}

/// POST /api/v1/services
pub async fn create(
    State(state): State<ServerState>,
    actor: Actor,
    Json(payload): Json<ServiceCreate>,
) -> AppResult<(StatusCode, Json<Service>)> {
    Policy::authorize(&actor, Action::ServiceManage, Target::Any)?;
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;
    validate_duration(payload.duration_minutes)?;
    validate_amount(payload.price, "price")?;

    let s = service::create(&state.pool, payload).await?;
    tracing::info!(service_id = s.id, operator = actor.user_id, "Service created");
    Ok((StatusCode::CREATED, Json(s)))
}

/// PUT /api/v1/services/:id
pub async fn update(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<ServiceUpdate>,
) -> AppResult<Json<Service>> {
    Policy::authorize(&actor, Action::ServiceManage, Target::Any)?;
    if let Some(name) = &payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;
    if let Some(minutes) = payload.duration_minutes {
        validate_duration(minutes)?;
    }
    if let Some(price) = payload.price {
        validate_amount(price, "price")?;
    }

    let s = service::update(&state.pool, id, payload).await?;
    Ok(Json(s))
}

/// DELETE /api/v1/services/:id - 软删除
pub async fn delete(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    Policy::authorize(&actor, Action::ServiceManage, Target::Any)?;
    service::soft_delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
