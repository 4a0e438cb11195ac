//! Client API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::auth::{Action, Actor, Policy, Target};
use crate::core::ServerState;
use crate::db::repository::appointment::{self, AppointmentFilter};
use crate::db::repository::{client, paging};
use crate::utils::validation::{
    MAX_EMAIL_LEN, MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text,
    validate_required_text,
};
use crate::utils::{AppError, AppResult};
use shared::models::{Appointment, Client, ClientCreate, ClientUpdate};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/v1/clients?search=
pub async fn list(
    State(state): State<ServerState>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Client>>> {
    Policy::authorize(&actor, Action::ClientRead, Target::Any)?;
    let (skip, limit) = paging(query.skip, query.limit);
    let clients = client::find_all(&state.pool, query.search.as_deref(), skip, limit).await?;
    Ok(Json(clients))
}

/// GET /api/v1/clients/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<Client>> {
    Policy::authorize(&actor, Action::ClientRead, Target::Client(id))?;
    let c = client::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Client {}", id)))?;
    Ok(Json(c))
}

/// POST /api/v1/clients
pub async fn create(
    State(state): State<ServerState>,
    actor: Actor,
    Json(payload): Json<ClientCreate>,
) -> AppResult<(StatusCode, Json<Client>)> {
    Policy::authorize(&actor, Action::ClientManage, Target::Any)?;
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.email, "email", MAX_EMAIL_LEN)?;
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.notes, "notes", MAX_NOTE_LEN)?;

    let c = client::create(&state.pool, payload).await?;
    tracing::info!(client_id = c.id, operator = actor.user_id, "Client created");
    Ok((StatusCode::CREATED, Json(c)))
}

/// PUT /api/v1/clients/:id
pub async fn update(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<ClientUpdate>,
) -> AppResult<Json<Client>> {
    Policy::authorize(&actor, Action::ClientManage, Target::Client(id))?;
    if let Some(name) = &payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    validate_optional_text(&payload.email, "email", MAX_EMAIL_LEN)?;
    validate_optional_text(&payload.phone, "phone", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.notes, "notes", MAX_NOTE_LEN)?;

    let c = client::update(&state.pool, id, payload).await?;
    Ok(Json(c))
}

/// DELETE /api/v1/clients/:id - 软删除
pub async fn delete(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    Policy::authorize(&actor, Action::ClientManage, Target::Client(id))?;
    client::soft_delete(&state.pool, id).await?;
    tracing::info!(client_id = id, operator = actor.user_id, "Client deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/clients/:id/appointments - 预约历史
pub async fn appointments(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<Appointment>>> {
    Policy::authorize(&actor, Action::AppointmentRead, Target::Client(id))?;
    client::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Client {}", id)))?;

    let (skip, limit) = paging(query.skip, query.limit);
    let filter = AppointmentFilter {
        client_id: Some(id),
        skip,
        limit,
        ..Default::default()
    };
    Ok(Json(appointment::find_all(&state.pool, &filter).await?))
}
