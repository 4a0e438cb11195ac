//! Shared types for the barbershop backend
//!
//! Common types used by the server and its API consumers: the unified
//! error system, response envelope, data models and small utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use http;
pub use serde::{Deserialize, Serialize};
