//! Request extractors
//!
//! [`CurrentUser`] comes from the JWT; [`Actor`] adds the barber/client
//! profiles linked to the account and is what handlers authorize against.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::ErrorCode;

use crate::AppError;
use crate::auth::{Actor, CurrentUser, JwtError, JwtService};
use crate::core::ServerState;
use crate::db::repository::user;
use crate::security_log;

/// JWT Auth Extractor
impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // Check if already extracted (from middleware)
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(header) => JwtService::extract_from_header(header)
                .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
            None => {
                security_log!("WARN", "auth_missing", uri = format!("{:?}", parts.uri));
                return Err(AppError::unauthorized());
            }
        };

        let user = authenticate(&state.get_jwt_service(), token, &parts.uri)?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// Validate a bearer token into a [`CurrentUser`], mapping failures to 401s
pub fn authenticate(
    jwt_service: &JwtService,
    token: &str,
    uri: &http::Uri,
) -> Result<CurrentUser, AppError> {
    let result = jwt_service
        .validate_token(token)
        .and_then(CurrentUser::try_from);

    result.map_err(|e| {
        security_log!(
            "WARN",
            "auth_failed",
            error = format!("{}", e),
            uri = format!("{:?}", uri)
        );
        match e {
            JwtError::ExpiredToken => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        }
    })
}

/// Actor extractor: one profile lookup per request
impl FromRequestParts<ServerState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(actor.clone());
        }

        let current = CurrentUser::from_request_parts(parts, state).await?;
        let links = user::find_profile_links(&state.pool, current.id)
            .await?
            .ok_or_else(|| AppError::invalid_token("Account no longer exists"))?;

        if !links.is_active {
            security_log!("WARN", "account_disabled", user_id = current.id);
            return Err(AppError::new(ErrorCode::AccountDisabled));
        }

        let actor = Actor::new(
            current.id,
            current.email,
            links.role,
            links.barber_id,
            links.client_id,
        );
        parts.extensions.insert(actor.clone());
        Ok(actor)
    }
}
