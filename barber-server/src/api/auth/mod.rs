//! Authentication Routes

mod handler;

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;

/// Build authentication router
/// - register / login / google: public (skipped by require_auth)
/// - me: protected
pub fn router() -> Router<ServerState> {
    Router::new().nest(
        "/api/v1/auth",
        Router::new()
            .route("/register", post(handler::register))
            .route("/login", post(handler::login))
            .route("/google", post(handler::google))
            .route("/me", get(handler::me)),
    )
}
