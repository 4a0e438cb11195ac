//! 统一错误处理
//!
//! HTTP 层只有一种错误: [`shared::error::AppError`]。这里把各层的错误
//! (`RepoError`、`DomainError`) 转换为它，handler 里直接用 `?`。
//!
//! | 来源 | 转换结果 |
//! |------|----------|
//! | `RepoError::NotFound` | 404 NotFound |
//! | `RepoError::Duplicate` | 409 AlreadyExists |
//! | `RepoError::Validation` | 400 ValidationFailed |
//! | `RepoError::Database` | 500 DatabaseError (消息只写日志) |
//! | `DomainError::*` | 对应的 4xxx 调度错误码 |

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

use crate::db::repository::RepoError;
use crate::scheduling::DomainError;

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::with_message(ErrorCode::NotFound, msg),
            RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::AlreadyExists, msg),
            RepoError::Validation(msg) => AppError::validation(msg),
            RepoError::Database(msg) => AppError::database(msg),
            RepoError::Domain(e) => e.into(),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        let code = match &err {
            DomainError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            DomainError::PauseNotSupported => ErrorCode::PauseNotSupported,
            DomainError::CancellationWindowClosed { .. } => ErrorCode::CancellationWindowClosed,
            DomainError::SlotUnavailable => ErrorCode::SlotUnavailable,
            DomainError::ConcurrentModification => ErrorCode::AppointmentModified,
            DomainError::NotCompleted => ErrorCode::AppointmentNotCompleted,
            DomainError::CommissionExists => ErrorCode::CommissionAlreadyExists,
            DomainError::InvalidRate(_) => ErrorCode::ValueOutOfRange,
        };
        AppError::with_message(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use shared::models::AppointmentStatus;

    #[test]
    fn test_repo_errors_map_to_status() {
        let e: AppError = RepoError::NotFound("Barber 1 not found".into()).into();
        assert_eq!(e.http_status(), StatusCode::NOT_FOUND);
        let e: AppError = RepoError::Duplicate("email".into()).into();
        assert_eq!(e.http_status(), StatusCode::CONFLICT);
        let e: AppError = RepoError::Database("disk I/O error".into()).into();
        assert_eq!(e.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_slot_unavailable_is_400_with_fixed_message() {
        let e: AppError = DomainError::SlotUnavailable.into();
        assert_eq!(e.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.message, "Time slot not available");
    }

    #[test]
    fn test_invalid_transition_is_400() {
        let e: AppError = DomainError::InvalidTransition {
            from: AppointmentStatus::Paused,
            action: "complete",
        }
        .into();
        assert_eq!(e.code, ErrorCode::InvalidTransition);
        assert_eq!(e.http_status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_lost_race_is_409() {
        let e: AppError = DomainError::ConcurrentModification.into();
        assert_eq!(e.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_database_message_is_not_exposed() {
        let e: AppError = RepoError::Database("no such table: appointments".into()).into();
        let body = ApiResponse::<()>::error(&e);
        assert!(!body.message.contains("no such table"));
    }
}
