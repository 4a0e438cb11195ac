//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`auth`] - 注册、登录、Google 登录
//! - [`barbers`] - 理发师管理
//! - [`services`] - 服务项目管理
//! - [`clients`] - 顾客管理
//! - [`appointments`] - 预约、可用时段、状态流转
//! - [`barber_blocks`] - 理发师休息时段
//! - [`commissions`] - 佣金
//!
//! 除 `/health` 和少数公共接口外，所有 `/api/v1` 路由都经过 [`require_auth`]。

pub mod appointments;
pub mod auth;
pub mod barber_blocks;
pub mod barbers;
pub mod clients;
pub mod commissions;
pub mod health;
pub mod services;

use std::time::Duration;

use axum::{Router, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::core::ServerState;

/// HTTP 请求日志中间件
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(target: "http_access", "{} {} {}", method, uri, response.status());

    response
}

/// Build the Axum router (without state)
pub fn build_router() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(barbers::router())
        .merge(services::router())
        .merge(clients::router())
        .merge(appointments::router())
        .merge(barber_blocks::router())
        .merge(commissions::router())
}

/// Router with authentication and the tower-http stack applied
pub fn build_app(state: &ServerState) -> Router<ServerState> {
    let cors = if state.config.is_development() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    build_router()
        // require_auth 内部会跳过公共路由
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(TimeoutLayer::new(Duration::from_millis(
            state.config.request_timeout_ms,
        )))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
