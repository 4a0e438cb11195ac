//! 认证授权模块
//!
//! - [`JwtService`] - JWT 令牌服务
//! - [`CurrentUser`] - 令牌中的用户
//! - [`Actor`] / [`Policy`] - 请求级能力检查
//! - [`require_auth`] - 认证中间件
//! - [`google`] - Google ID token 校验

pub mod extractor;
pub mod google;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod policy;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::require_auth;
pub use policy::{Action, Actor, AppointmentScope, Policy, Target};
