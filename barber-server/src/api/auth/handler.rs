//! Authentication Handlers
//!
//! Handles registration, password login, Google login and token issuing

use std::time::Duration;

use axum::{Json, extract::State, http::StatusCode};
use shared::ErrorCode;
use shared::models::{
    GoogleLoginRequest, LoginRequest, LoginResponse, RegisterRequest, Role, User, UserCreate,
    UserInfo,
};

use crate::auth::{Actor, google, password, permissions};
use crate::core::ServerState;
use crate::db::repository::{RepoError, user};
use crate::security_log;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_email, validate_optional_text, validate_password,
    validate_required_text,
};
use crate::utils::{AppError, AppResult};

/// Fixed delay for authentication to prevent timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 200;

/// Issue a token for `user` and build the login response
async fn login_response(state: &ServerState, user: &User) -> AppResult<LoginResponse> {
    let jwt_service = state.get_jwt_service();
    let token = jwt_service
        .generate_token(user.id, &user.email, user.role)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

    let links = user::find_profile_links(&state.pool, user.id).await?;
    let (barber_id, client_id) = links
        .map(|l| (l.barber_id, l.client_id))
        .unwrap_or((None, None));

    Ok(LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        expires_in: jwt_service.expires_in_seconds(),
        user: UserInfo {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            permissions: permissions::get_default_permissions(user.role),
            barber_id,
            client_id,
        },
    })
}

fn email_taken(err: RepoError) -> AppError {
    match err {
        RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::EmailAlreadyRegistered, msg),
        other => other.into(),
    }
}

/// POST /api/v1/auth/register - 注册顾客账号 (同时创建顾客档案)
pub async fn register(
    State(state): State<ServerState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<LoginResponse>)> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    validate_required_text(&req.full_name, "full_name", MAX_NAME_LEN)?;
    validate_optional_text(&req.phone, "phone", MAX_SHORT_TEXT_LEN)?;

    let password_hash = password::hash_password(&req.password)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))?;

    let (user, client) = user::create_client_account(
        &state.pool,
        UserCreate {
            email: req.email.trim().to_string(),
            full_name: req.full_name.trim().to_string(),
            phone: req.phone,
            role: Role::Client,
            password_hash: Some(password_hash),
            google_sub: None,
        },
    )
    .await
    .map_err(email_taken)?;

    tracing::info!(user_id = user.id, client_id = client.id, "Client account registered");
    let response = login_response(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
///
/// Unknown email, wrong password and Google-only accounts all get the same
/// `InvalidCredentials` error.
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let email = req.email.trim().to_string();
    let found = user::find_by_email(&state.pool, &email).await?;

    // Fixed delay to prevent timing attacks (before checking result)
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    let user = match found {
        Some(u) => {
            let valid = u
                .password_hash
                .as_deref()
                .is_some_and(|hash| password::verify_password(&req.password, hash));
            if !valid {
                security_log!("WARN", "login_failed", email = email.as_str(), reason = "invalid_password");
                return Err(AppError::invalid_credentials());
            }
            if !u.is_active {
                security_log!("WARN", "login_failed", email = email.as_str(), reason = "account_disabled");
                return Err(AppError::new(ErrorCode::AccountDisabled));
            }
            u
        }
        None => {
            security_log!("WARN", "login_failed", email = email.as_str(), reason = "user_not_found");
            return Err(AppError::invalid_credentials());
        }
    };

    security_log!("INFO", "login_success", user_id = user.id, role = user.role.as_str());
    tracing::info!(user_id = user.id, role = %user.role, "User logged in successfully");

    Ok(Json(login_response(&state, &user).await?))
}

/// POST /api/v1/auth/google - Google ID token 登录
///
/// 首次登录自动创建顾客账号；已存在的同邮箱账号会绑定 Google 身份。
pub async fn google(
    State(state): State<ServerState>,
    Json(req): Json<GoogleLoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let client_id = state
        .config
        .google_client_id
        .as_deref()
        .ok_or_else(|| AppError::new(ErrorCode::GoogleLoginDisabled))?;

    let identity = google::verify_id_token(&state.http_client, client_id, &req.credential).await?;

    let user = match user::find_by_google_sub(&state.pool, &identity.sub).await? {
        Some(u) => u,
        None => match user::find_by_email(&state.pool, &identity.email).await? {
            Some(u) if u.google_sub.is_none() => {
                user::link_google_sub(&state.pool, u.id, &identity.sub).await?;
                tracing::info!(user_id = u.id, "Google account linked");
                u
            }
            Some(u) => {
                security_log!("WARN", "google_login_mismatch", user_id = u.id);
                return Err(AppError::with_message(
                    ErrorCode::GoogleTokenInvalid,
                    "Email is linked to another Google account",
                ));
            }
            None => {
                let full_name = identity
                    .name
                    .clone()
                    .unwrap_or_else(|| identity.email.clone());
                let (u, _) = user::create_client_account(
                    &state.pool,
                    UserCreate {
                        email: identity.email.clone(),
                        full_name,
                        phone: None,
                        role: Role::Client,
                        password_hash: None,
                        google_sub: Some(identity.sub.clone()),
                    },
                )
                .await
                .map_err(email_taken)?;
                tracing::info!(user_id = u.id, "Client account created from Google login");
                u
            }
        },
    };

    if !user.is_active {
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    security_log!("INFO", "login_success", user_id = user.id, method = "google");
    Ok(Json(login_response(&state, &user).await?))
}

/// GET /api/v1/auth/me
pub async fn me(State(state): State<ServerState>, actor: Actor) -> AppResult<Json<UserInfo>> {
    let user = user::find_by_id(&state.pool, actor.user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {}", actor.user_id)))?;

    Ok(Json(UserInfo {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        role: actor.role,
        permissions: actor.permissions,
        barber_id: actor.barber_id,
        client_id: actor.client_id,
    }))
}
