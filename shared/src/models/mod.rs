//! Data models
//!
//! Shared between barber-server and API consumers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` snowflakes, all timestamps Unix millis.

pub mod appointment;
pub mod barber;
pub mod barber_block;
pub mod client;
pub mod commission;
pub mod record_state;
pub mod service;
pub mod user;

// Re-exports
pub use appointment::*;
pub use barber::*;
pub use barber_block::*;
pub use client::*;
pub use commission::*;
pub use record_state::*;
pub use service::*;
pub use user::*;
