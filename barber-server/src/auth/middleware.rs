//! 认证中间件

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppError;
use crate::auth::JwtService;
use crate::auth::extractor::authenticate;
use crate::core::ServerState;
use crate::security_log;

/// 无需认证的 API 路由
const PUBLIC_API_ROUTES: &[&str] = &[
    "/api/v1/auth/login",
    "/api/v1/auth/register",
    "/api/v1/auth/google",
];

/// 按预约码查询是公开的
const PUBLIC_API_PREFIXES: &[&str] = &["/api/v1/appointments/by-code/"];

fn is_public_api_route(path: &str) -> bool {
    PUBLIC_API_ROUTES.contains(&path) || PUBLIC_API_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// 认证中间件 - 要求用户登录
///
/// 从 `Authorization: Bearer <token>` 头提取并验证 JWT，
/// 成功后将 [`crate::auth::CurrentUser`] 注入请求扩展。
///
/// # 跳过认证的路径
///
/// - `OPTIONS *` (CORS 预检)
/// - 非 `/api/` 路径 (`/health`)
/// - 注册、登录、Google 登录、按预约码查询
///
/// # 错误处理
///
/// | 错误 | HTTP 状态码 |
/// |------|------------|
/// | 无 Authorization 头 | 401 Unauthorized |
/// | 令牌过期 | 401 TokenExpired |
/// | 无效令牌 | 401 InvalidToken |
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path();

    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    // 非 API 路由跳过认证 (让它们正常返回 404)
    if !path.starts_with("/api/") || is_public_api_route(path) {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            security_log!("WARN", "auth_missing", uri = format!("{:?}", req.uri()));
            return Err(AppError::unauthorized());
        }
    };

    let user = authenticate(&state.get_jwt_service(), token, req.uri())?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_routes() {
        assert!(is_public_api_route("/api/v1/auth/login"));
        assert!(is_public_api_route("/api/v1/appointments/by-code/AB12CD34"));
        assert!(!is_public_api_route("/api/v1/auth/me"));
        assert!(!is_public_api_route("/api/v1/appointments"));
    }
}
