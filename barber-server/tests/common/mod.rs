//! 集成测试公共设施
//!
//! 每个测试一个临时 SQLite 数据库，路由直接用 `oneshot` 调用，不监听端口。

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use barber_server::api::build_app;
use barber_server::db::repository::{barber, service, user};
use barber_server::{Config, ServerState};
use chrono::{Duration, Utc};
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use shared::models::{BarberCreate, Role, ServiceCreate, UserCreate};
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub state: ServerState,
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("barbershop.db");
        let mut config = Config::with_overrides(path.to_string_lossy(), 0);
        config.timezone = chrono_tz::UTC;

        let state = ServerState::initialize(&config).await.expect("init state");
        let router = build_app(&state).with_state(state.clone());
        Self {
            state,
            router,
            _dir: dir,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => builder
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let resp = self.router.clone().oneshot(req).await.expect("response");
        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    fn token_for(&self, user_id: i64, email: &str, role: Role) -> String {
        self.state
            .jwt_service
            .generate_token(user_id, email, role)
            .expect("token")
    }

    /// Token of the bootstrap admin
    pub async fn admin_token(&self) -> String {
        let email = self.state.config.admin_email.clone();
        let admin = user::find_by_email(&self.state.pool, &email)
            .await
            .expect("query admin")
            .expect("bootstrap admin");
        self.token_for(admin.id, &admin.email, Role::Admin)
    }

    /// Barber profile linked to a barber account: `(barber_id, token)`
    pub async fn barber(&self, name: &str, rate: Option<f64>) -> (i64, String) {
        let email = format!("{}@barbershop.test", name.to_lowercase());
        let account = user::create(
            &self.state.pool,
            UserCreate {
                email: email.clone(),
                full_name: name.to_string(),
                phone: None,
                role: Role::Barber,
                password_hash: None,
                google_sub: None,
            },
        )
        .await
        .expect("barber account");
        let profile = barber::create(
            &self.state.pool,
            BarberCreate {
                name: name.to_string(),
                user_id: Some(account.id),
                email: Some(email.clone()),
                phone: None,
                specialties: None,
                commission_rate: rate,
                is_available: true,
            },
        )
        .await
        .expect("barber profile");
        (profile.id, self.token_for(account.id, &email, Role::Barber))
    }

    /// Client account with its profile: `(client_id, token)`
    pub async fn client(&self, name: &str) -> (i64, String) {
        let email = format!("{}@mail.test", name.to_lowercase());
        let (account, profile) = user::create_client_account(
            &self.state.pool,
            UserCreate {
                email: email.clone(),
                full_name: name.to_string(),
                phone: None,
                role: Role::Client,
                password_hash: None,
                google_sub: None,
            },
        )
        .await
        .expect("client account");
        (profile.id, self.token_for(account.id, &email, Role::Client))
    }

    pub async fn service(&self, minutes: i64, price: f64, pausable: bool) -> i64 {
        service::create(
            &self.state.pool,
            ServiceCreate {
                name: format!("Corte {minutes}m"),
                description: None,
                duration_minutes: minutes,
                price,
                supports_pause: pausable,
                expected_pause_minutes: if pausable { 20 } else { 0 },
            },
        )
        .await
        .expect("service")
        .id
    }
}

/// Local (UTC) date `days` from today, `YYYY-MM-DD`
pub fn future_day(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days)).to_string()
}

/// Local start time on `day`
pub fn at(day: &str, hhmm: &str) -> String {
    format!("{day}T{hhmm}:00")
}
