use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::auth::JwtService;
use crate::core::{Config, ServerError};
use crate::db::DbService;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 所有业务状态都在数据库中；这里只有连接池、配置和无状态服务。
/// Clone 是浅拷贝。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | SQLite 连接池 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | http_client | reqwest::Client | 外部 HTTP 调用 (Google tokeninfo) |
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub pool: SqlitePool,
    /// JWT 认证服务
    pub jwt_service: Arc<JwtService>,
    /// 出站 HTTP 客户端
    pub http_client: reqwest::Client,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`ServerState::initialize`] 代替
    pub fn new(config: Config, pool: SqlitePool) -> Self {
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            config,
            pool,
            jwt_service,
            http_client,
        }
    }

    /// 初始化服务器状态
    ///
    /// 1. 打开数据库并执行迁移
    /// 2. 确保存在管理员账号
    pub async fn initialize(config: &Config) -> Result<Self, ServerError> {
        let default_password = config.admin_password == crate::core::config::DEFAULT_ADMIN_PASSWORD;
        if default_password && config.is_production() {
            return Err(ServerError::Config(
                "ADMIN_PASSWORD must be set in production".into(),
            ));
        }

        if let Some(parent) = std::path::Path::new(&config.database_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = DbService::new(&config.database_path)
            .await
            .map_err(|e| ServerError::Database(e.to_string()))?;

        db.ensure_admin(&config.admin_email, &config.admin_password)
            .await
            .map_err(|e| ServerError::Database(e.to_string()))?;

        if default_password {
            tracing::warn!(
                email = %config.admin_email,
                "⚠️  Admin account uses the default password, set ADMIN_PASSWORD"
            );
        }
        if config.google_client_id.is_none() {
            tracing::info!("GOOGLE_CLIENT_ID not set, Google login disabled");
        }

        Ok(Self::new(config.clone(), db.pool))
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }
}
