//! Barber Block API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::ErrorCode;
use shared::models::{BarberBlock, BarberBlockCreate, BarberBlockUpdate, Role};

use crate::auth::{Action, Actor, Policy, Target};
use crate::core::ServerState;
use crate::db::repository::{barber, barber_block};
use crate::utils::time::parse_date;
use crate::utils::validation::{MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub barber_id: Option<i64>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

async fn load(state: &ServerState, id: i64) -> AppResult<BarberBlock> {
    barber_block::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::BlockNotFound,
                format!("Barber block {} not found", id),
            )
        })
}

fn validate_texts(reason: &Option<String>, notes: &Option<String>) -> AppResult<()> {
    validate_optional_text(reason, "reason", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(notes, "notes", MAX_NOTE_LEN)
}

/// GET /api/v1/barber-blocks - barbers only see their own
pub async fn list(
    State(state): State<ServerState>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<BarberBlock>>> {
    let barber_id = match (actor.role, actor.barber_id) {
        (Role::Barber, Some(own)) => Some(own),
        _ => query.barber_id,
    };
    let target = barber_id.map_or(Target::Any, Target::Barber);
    Policy::authorize(&actor, Action::BlockRead, target)?;

    let from = query.date_from.as_deref().map(parse_date).transpose()?;
    let to = query.date_to.as_deref().map(parse_date).transpose()?;
    let blocks = barber_block::find_all(&state.pool, barber_id, from, to).await?;
    Ok(Json(blocks))
}

/// GET /api/v1/barber-blocks/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<Json<BarberBlock>> {
    let block = load(&state, id).await?;
    Policy::authorize(&actor, Action::BlockRead, Target::Barber(block.barber_id))?;
    Ok(Json(block))
}

/// POST /api/v1/barber-blocks
pub async fn create(
    State(state): State<ServerState>,
    actor: Actor,
    Json(payload): Json<BarberBlockCreate>,
) -> AppResult<(StatusCode, Json<BarberBlock>)> {
    Policy::authorize(&actor, Action::BlockManage, Target::Barber(payload.barber_id))?;
    validate_texts(&payload.reason, &payload.notes)?;
    barber::find_by_id(&state.pool, payload.barber_id)
        .await?
        .ok_or_else(|| AppError::with_message(ErrorCode::BarberNotFound, "Barber not found"))?;

    let block = barber_block::create(&state.pool, payload, state.config.timezone).await?;
    tracing::info!(
        block_id = block.id,
        barber_id = block.barber_id,
        date = %block.block_date,
        all_day = block.all_day,
        operator = actor.user_id,
        "Barber block created"
    );
    Ok((StatusCode::CREATED, Json(block)))
}

/// PUT /api/v1/barber-blocks/:id
pub async fn update(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<BarberBlockUpdate>,
) -> AppResult<Json<BarberBlock>> {
    let block = load(&state, id).await?;
    Policy::authorize(&actor, Action::BlockManage, Target::Barber(block.barber_id))?;
    validate_texts(&payload.reason, &payload.notes)?;

    let block = barber_block::update(&state.pool, id, payload, state.config.timezone).await?;
    tracing::info!(block_id = id, operator = actor.user_id, "Barber block updated");
    Ok(Json(block))
}

/// DELETE /api/v1/barber-blocks/:id
pub async fn delete(
    State(state): State<ServerState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let block = load(&state, id).await?;
    Policy::authorize(&actor, Action::BlockManage, Target::Barber(block.barber_id))?;
    barber_block::soft_delete(&state.pool, id).await?;
    tracing::info!(block_id = id, operator = actor.user_id, "Barber block deleted");
    Ok(StatusCode::NO_CONTENT)
}
