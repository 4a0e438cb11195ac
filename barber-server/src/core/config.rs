use chrono::NaiveTime;
use chrono_tz::Tz;

use crate::auth::JwtConfig;
use crate::core::ServerError;
use crate::scheduling::LifecycleRules;

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATABASE_PATH | data/barbershop.db | SQLite 数据库文件 |
/// | HTTP_PORT | 8000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | TIMEZONE | America/Sao_Paulo | 营业时区 (IANA) |
/// | OPENING_TIME | 08:00 | 开门时间 |
/// | CLOSING_TIME | 18:00 | 关门时间 |
/// | SLOT_MINUTES | 30 | 预约时段长度 |
/// | CANCELLATION_LEAD_MINUTES | 120 | 取消/改期最少提前时间 |
/// | DEFAULT_SERVICE_COMMISSION_RATE | 0.30 | 服务默认佣金比例 |
/// | DEFAULT_PRODUCT_COMMISSION_RATE | 0.25 | 商品默认佣金比例 |
/// | GOOGLE_CLIENT_ID | (unset) | 未设置时禁用 Google 登录 |
/// | ADMIN_EMAIL | admin@barbershop.local | 初始管理员账号 |
/// | ADMIN_PASSWORD | admin123 | 初始管理员密码 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
///
/// JWT 相关变量见 [`JwtConfig::from_env`]。
///
/// # 示例
///
/// ```ignore
/// DATABASE_PATH=/data/shop.db HTTP_PORT=8080 TIMEZONE=Europe/Lisbon cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 数据库文件路径
    pub database_path: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// JWT 认证配置
    pub jwt: JwtConfig,

    // === 营业规则 ===
    /// 营业时区，所有本地日期/时间都按此解释
    pub timezone: Tz,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub slot_minutes: i64,
    pub cancellation_lead_minutes: i64,
    pub default_service_commission_rate: f64,
    pub default_product_commission_rate: f64,

    // === 认证 ===
    /// Google OAuth client id (audience of accepted ID tokens)
    pub google_client_id: Option<String>,
    pub admin_email: String,
    pub admin_password: String,

    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
}

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

impl Config {
    /// 从环境变量加载配置
    ///
    /// 未设置的变量使用默认值；格式错误的变量返回 [`ServerError::Config`]。
    pub fn from_env() -> Result<Self, ServerError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let jwt = JwtConfig::from_env(environment == "development")
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let mut config = Self::defaults(jwt);
        config.environment = environment;

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = path;
        }
        config.http_port = env_parse("HTTP_PORT")?.unwrap_or(config.http_port);

        if let Ok(tz) = std::env::var("TIMEZONE") {
            config.timezone = tz
                .parse()
                .map_err(|_| ServerError::Config(format!("Invalid TIMEZONE: {tz}")))?;
        }
        if let Ok(t) = std::env::var("OPENING_TIME") {
            config.opening_time = parse_time_of_day("OPENING_TIME", &t)?;
        }
        if let Ok(t) = std::env::var("CLOSING_TIME") {
            config.closing_time = parse_time_of_day("CLOSING_TIME", &t)?;
        }
        config.slot_minutes = env_parse("SLOT_MINUTES")?.unwrap_or(config.slot_minutes);
        config.cancellation_lead_minutes =
            env_parse("CANCELLATION_LEAD_MINUTES")?.unwrap_or(config.cancellation_lead_minutes);
        config.default_service_commission_rate = env_parse("DEFAULT_SERVICE_COMMISSION_RATE")?
            .unwrap_or(config.default_service_commission_rate);
        config.default_product_commission_rate = env_parse("DEFAULT_PRODUCT_COMMISSION_RATE")?
            .unwrap_or(config.default_product_commission_rate);
        config.request_timeout_ms =
            env_parse("REQUEST_TIMEOUT_MS")?.unwrap_or(config.request_timeout_ms);

        config.google_client_id = std::env::var("GOOGLE_CLIENT_ID")
            .ok()
            .filter(|s| !s.trim().is_empty());
        if let Ok(email) = std::env::var("ADMIN_EMAIL") {
            config.admin_email = email;
        }
        if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
            config.admin_password = password;
        }

        config.validate()?;
        Ok(config)
    }

    /// 使用自定义值覆盖部分配置 (不读取环境变量)
    ///
    /// 常用于测试场景
    pub fn with_overrides(database_path: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::defaults(JwtConfig::with_secret(
            "test-secret-key-that-is-long-enough-for-hs256",
        ));
        config.database_path = database_path.into();
        config.http_port = http_port;
        config
    }

    fn defaults(jwt: JwtConfig) -> Self {
        Self {
            database_path: "data/barbershop.db".into(),
            http_port: 8000,
            environment: "development".into(),
            jwt,
            timezone: chrono_tz::America::Sao_Paulo,
            opening_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            closing_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_minutes: 30,
            cancellation_lead_minutes: 120,
            default_service_commission_rate: 0.30,
            default_product_commission_rate: 0.25,
            google_client_id: None,
            admin_email: "admin@barbershop.local".into(),
            admin_password: DEFAULT_ADMIN_PASSWORD.into(),
            request_timeout_ms: 30000,
        }
    }

    fn validate(&self) -> Result<(), ServerError> {
        if self.opening_time >= self.closing_time {
            return Err(ServerError::Config(
                "OPENING_TIME must be earlier than CLOSING_TIME".into(),
            ));
        }
        if self.slot_minutes <= 0 {
            return Err(ServerError::Config("SLOT_MINUTES must be positive".into()));
        }
        if self.cancellation_lead_minutes < 0 {
            return Err(ServerError::Config(
                "CANCELLATION_LEAD_MINUTES must not be negative".into(),
            ));
        }
        for (name, rate) in [
            ("DEFAULT_SERVICE_COMMISSION_RATE", self.default_service_commission_rate),
            ("DEFAULT_PRODUCT_COMMISSION_RATE", self.default_product_commission_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ServerError::Config(format!("{name} must be within 0..=1")));
            }
        }
        Ok(())
    }

    /// 生命周期规则 (取消提前量)
    pub fn lifecycle_rules(&self) -> LifecycleRules {
        LifecycleRules {
            cancellation_lead_minutes: self.cancellation_lead_minutes,
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ServerError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ServerError::Config(format!("Invalid {name}: {raw}"))),
        Err(_) => Ok(None),
    }
}

fn parse_time_of_day(name: &str, raw: &str) -> Result<NaiveTime, ServerError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ServerError::Config(format!("Invalid {name}: {raw} (expected HH:MM)")))
}
