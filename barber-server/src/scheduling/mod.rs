//! 调度核心 - 纯函数，无 I/O
//!
//! - [`availability`] - 半开区间冲突检测与时段网格
//! - [`lifecycle`] - 预约状态机
//! - [`commission`] - 佣金计算
//!
//! Repository 和 handler 负责取数据、写回结果；这里只做判断和计算。

pub mod availability;
pub mod commission;
pub mod lifecycle;

pub use availability::{Interval, first_conflict, overlaps, slot_grid};
pub use commission::{CommissionAmount, calculate};
pub use lifecycle::{LifecycleRules, LifecycleState, Transition, apply};

use shared::models::AppointmentStatus;
use thiserror::Error;

/// 业务规则错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Invalid transition: cannot {action} an appointment that is {from}")]
    InvalidTransition {
        from: AppointmentStatus,
        action: &'static str,
    },

    #[error("None of the appointment's services supports pausing")]
    PauseNotSupported,

    #[error("Appointments can only be changed up to {lead_minutes} minutes before the start")]
    CancellationWindowClosed { lead_minutes: i64 },

    #[error("Time slot not available")]
    SlotUnavailable,

    #[error("Appointment was modified concurrently, reload and retry")]
    ConcurrentModification,

    #[error("Appointment is not completed")]
    NotCompleted,

    #[error("Commission already exists for this appointment")]
    CommissionExists,

    #[error("Invalid commission rate: {0}")]
    InvalidRate(f64),
}
