//! Barbershop backend - appointments, availability and commissions
//!
//! # 架构概述
//!
//! - **调度核心** (`scheduling`): availability checks, appointment state machine,
//!   commission calculation. Pure functions, no I/O.
//! - **数据库** (`db`): SQLite via sqlx, one free-function repository per table
//! - **认证** (`auth`): JWT + Argon2, Google ID token login, capability policy
//! - **HTTP API** (`api`): REST endpoints under `/api/v1`
//!
//! # 模块结构
//!
//! ```text
//! barber-server/src/
//! ├── core/          # 配置、状态、服务器、错误
//! ├── auth/          # JWT 认证、权限策略
//! ├── db/            # 连接池、迁移、repository
//! ├── scheduling/    # 可用性、生命周期、佣金
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 错误转换、日志、校验、时间
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod scheduling;
pub mod utils;

// Re-export 公共类型
pub use auth::{Actor, CurrentUser, JwtService, Policy};
pub use core::{Config, Server, ServerState};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::init_logger;

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境: 加载 .env 并初始化日志
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    // .env 可选
    let _ = dotenv::dotenv();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let json = std::env::var("LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok());
    let log_dir = std::env::var("LOG_DIR").ok();
    utils::logger::init_logger_with_file(log_level.as_deref(), json, log_dir.as_deref())?;

    Ok(())
}
