//! Appointment state machine
//!
//! ```text
//! PENDING ──confirm──▶ CONFIRMED ──start──▶ IN_PROGRESS ──complete──▶ COMPLETED
//!                                             │    ▲
//!                                        pause│    │resume
//!                                             ▼    │
//!                                            PAUSED
//!
//! PENDING | CONFIRMED                       ──no_show──▶    NO_SHOW
//! PENDING | CONFIRMED                       ──reschedule──▶ RESCHEDULED
//! PENDING | CONFIRMED | IN_PROGRESS | PAUSED ──cancel──▶    CANCELLED
//! ```
//!
//! [`apply`] never touches storage: it validates the transition against the
//! current snapshot and returns the lifecycle columns to write back.

use shared::models::{Appointment, AppointmentStatus};

use super::DomainError;
use crate::utils::time::MINUTE_MS;

/// Configurable guards
#[derive(Debug, Clone, Copy)]
pub struct LifecycleRules {
    /// Cancel and reschedule need at least this much notice
    pub cancellation_lead_minutes: i64,
}

impl Default for LifecycleRules {
    fn default() -> Self {
        Self {
            cancellation_lead_minutes: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Confirm,
    Start,
    Pause { reason: Option<String> },
    Resume,
    Complete,
    Cancel { actor: i64, reason: Option<String> },
    NoShow,
    Reschedule,
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Start => "start",
            Self::Pause { .. } => "pause",
            Self::Resume => "resume",
            Self::Complete => "complete",
            Self::Cancel { .. } => "cancel",
            Self::NoShow => "mark as no-show",
            Self::Reschedule => "reschedule",
        }
    }

    /// Map a requested target status onto a transition
    ///
    /// Used by the generic status endpoints; the previous status decides
    /// between start and resume.
    pub fn to_status(
        current: AppointmentStatus,
        target: AppointmentStatus,
        actor: i64,
        reason: Option<String>,
    ) -> Result<Self, DomainError> {
        use AppointmentStatus::*;
        Ok(match target {
            Confirmed => Self::Confirm,
            InProgress if current == Paused => Self::Resume,
            InProgress => Self::Start,
            Paused => Self::Pause { reason },
            Completed => Self::Complete,
            Cancelled => Self::Cancel { actor, reason },
            NoShow => Self::NoShow,
            Pending | Rescheduled => {
                return Err(DomainError::InvalidTransition {
                    from: current,
                    action: if target == Pending {
                        "move back to pending"
                    } else {
                        "reschedule without a new time"
                    },
                });
            }
        })
    }
}

/// Lifecycle columns of an appointment
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleState {
    pub status: AppointmentStatus,
    pub end_at: i64,
    pub started_at: Option<i64>,
    pub paused_at: Option<i64>,
    pub resumed_at: Option<i64>,
    pub pause_reason: Option<String>,
    pub pause_duration_minutes: i64,
    pub completed_at: Option<i64>,
    pub active_duration_minutes: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub cancelled_by: Option<i64>,
    pub cancellation_reason: Option<String>,
}

impl LifecycleState {
    pub fn of(appointment: &Appointment) -> Self {
        Self {
            status: appointment.status,
            end_at: appointment.end_at,
            started_at: appointment.started_at,
            paused_at: appointment.paused_at,
            resumed_at: appointment.resumed_at,
            pause_reason: appointment.pause_reason.clone(),
            pause_duration_minutes: appointment.pause_duration_minutes,
            completed_at: appointment.completed_at,
            active_duration_minutes: appointment.active_duration_minutes,
            cancelled_at: appointment.cancelled_at,
            cancelled_by: appointment.cancelled_by,
            cancellation_reason: appointment.cancellation_reason.clone(),
        }
    }
}

/// Notice still available before the start
pub fn within_change_window(appointment: &Appointment, now: i64, rules: &LifecycleRules) -> bool {
    now < appointment.start_at - rules.cancellation_lead_minutes * MINUTE_MS
}

/// Validate `transition` against the snapshot and compute the new lifecycle state.
///
/// The caller persists the result with a compare-and-set on the snapshot's status.
pub fn apply(
    appointment: &Appointment,
    transition: &Transition,
    now: i64,
    rules: &LifecycleRules,
) -> Result<LifecycleState, DomainError> {
    use AppointmentStatus::*;

    let from = appointment.status;
    let invalid = || DomainError::InvalidTransition {
        from,
        action: transition.name(),
    };
    let mut next = LifecycleState::of(appointment);

    match transition {
        Transition::Confirm => {
            if from != Pending {
                return Err(invalid());
            }
            next.status = Confirmed;
        }
        Transition::Start => {
            if from != Confirmed {
                return Err(invalid());
            }
            next.status = InProgress;
            next.started_at = Some(now);
        }
        Transition::Pause { reason } => {
            if from != InProgress {
                return Err(invalid());
            }
            if !appointment.services.iter().any(|s| s.supports_pause) {
                return Err(DomainError::PauseNotSupported);
            }
            next.status = Paused;
            next.paused_at = Some(now);
            next.pause_reason = reason.clone();
        }
        Transition::Resume => {
            if from != Paused {
                return Err(invalid());
            }
            let paused_at = appointment.paused_at.unwrap_or(now);
            next.status = InProgress;
            next.pause_duration_minutes += elapsed_minutes(paused_at, now);
            next.resumed_at = Some(now);
        }
        Transition::Complete => {
            if from != InProgress {
                return Err(invalid());
            }
            let started_at = appointment.started_at.unwrap_or(appointment.start_at);
            let active = elapsed_minutes(started_at, now) - appointment.pause_duration_minutes;
            next.status = Completed;
            next.end_at = now.max(appointment.start_at + 1);
            next.completed_at = Some(now);
            next.active_duration_minutes = Some(active.max(0));
        }
        Transition::Cancel { actor, reason } => {
            if !matches!(from, Pending | Confirmed | InProgress | Paused) {
                return Err(invalid());
            }
            ensure_window(appointment, now, rules)?;
            next.status = Cancelled;
            next.cancelled_at = Some(now);
            next.cancelled_by = Some(*actor);
            next.cancellation_reason = reason.clone();
        }
        Transition::NoShow => {
            if !matches!(from, Pending | Confirmed) {
                return Err(invalid());
            }
            next.status = NoShow;
        }
        Transition::Reschedule => {
            if !matches!(from, Pending | Confirmed) {
                return Err(invalid());
            }
            ensure_window(appointment, now, rules)?;
            next.status = Rescheduled;
        }
    }

    Ok(next)
}

fn ensure_window(
    appointment: &Appointment,
    now: i64,
    rules: &LifecycleRules,
) -> Result<(), DomainError> {
    if within_change_window(appointment, now, rules) {
        Ok(())
    } else {
        Err(DomainError::CancellationWindowClosed {
            lead_minutes: rules.cancellation_lead_minutes,
        })
    }
}

/// Whole minutes between two instants (truncated, never negative)
fn elapsed_minutes(from: i64, to: i64) -> i64 {
    ((to - from) / MINUTE_MS).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{AppointmentService, AppointmentType};

    const M: i64 = MINUTE_MS;
    const T0: i64 = 1_753_092_000_000; // 2025-07-21 10:00 UTC

    fn appointment(status: AppointmentStatus, supports_pause: bool) -> Appointment {
        Appointment {
            id: 1,
            code: "AB12CD34".into(),
            client_id: 2,
            barber_id: 3,
            appointment_type: AppointmentType::Regular,
            status,
            start_at: T0,
            end_at: T0 + 30 * M,
            duration_minutes: 30,
            total_amount: 100.0,
            discount_amount: 0.0,
            final_amount: 100.0,
            client_notes: None,
            barber_notes: None,
            started_at: None,
            paused_at: None,
            resumed_at: None,
            pause_reason: None,
            pause_duration_minutes: 0,
            completed_at: None,
            active_duration_minutes: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            rescheduled_from_id: None,
            rescheduled_to_id: None,
            created_at: 0,
            updated_at: 0,
            services: vec![AppointmentService {
                appointment_id: 1,
                service_id: 9,
                name: "Coloração".into(),
                price: 100.0,
                duration_minutes: 30,
                supports_pause,
            }],
        }
    }

    fn with_state(mut appt: Appointment, state: LifecycleState) -> Appointment {
        appt.status = state.status;
        appt.end_at = state.end_at;
        appt.started_at = state.started_at;
        appt.paused_at = state.paused_at;
        appt.resumed_at = state.resumed_at;
        appt.pause_duration_minutes = state.pause_duration_minutes;
        appt.completed_at = state.completed_at;
        appt.active_duration_minutes = state.active_duration_minutes;
        appt
    }

    #[test]
    fn test_happy_path_with_pause() {
        let rules = LifecycleRules::default();
        let mut appt = appointment(AppointmentStatus::Pending, true);

        appt = with_state(appt.clone(), apply(&appt, &Transition::Confirm, T0 - 60 * M, &rules).unwrap());
        appt = with_state(appt.clone(), apply(&appt, &Transition::Start, T0, &rules).unwrap());
        assert_eq!(appt.started_at, Some(T0));

        let pause = Transition::Pause {
            reason: Some("dye setting".into()),
        };
        appt = with_state(appt.clone(), apply(&appt, &pause, T0 + 10 * M, &rules).unwrap());
        assert_eq!(appt.status, AppointmentStatus::Paused);

        // resume 25.5 minutes later: truncated to 25
        let resume_at = T0 + 35 * M + 30_000;
        appt = with_state(appt.clone(), apply(&appt, &Transition::Resume, resume_at, &rules).unwrap());
        assert_eq!(appt.status, AppointmentStatus::InProgress);
        assert_eq!(appt.pause_duration_minutes, 25);
        assert_eq!(appt.resumed_at, Some(resume_at));

        let done = apply(&appt, &Transition::Complete, T0 + 50 * M, &rules).unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
        assert_eq!(done.end_at, T0 + 50 * M);
        assert_eq!(done.active_duration_minutes, Some(25));
        assert_eq!(done.pause_duration_minutes, 25);
    }

    #[test]
    fn test_pauses_accumulate() {
        let rules = LifecycleRules::default();
        let mut appt = appointment(AppointmentStatus::InProgress, true);
        appt.started_at = Some(T0);

        for (pause, resume) in [(5, 15), (20, 27)] {
            let p = Transition::Pause { reason: None };
            appt = with_state(appt.clone(), apply(&appt, &p, T0 + pause * M, &rules).unwrap());
            appt = with_state(appt.clone(), apply(&appt, &Transition::Resume, T0 + resume * M, &rules).unwrap());
        }
        assert_eq!(appt.pause_duration_minutes, 17);
    }

    #[test]
    fn test_complete_from_paused_is_rejected() {
        let mut appt = appointment(AppointmentStatus::Paused, true);
        appt.started_at = Some(T0);
        appt.paused_at = Some(T0 + 5 * M);
        let err = apply(&appt, &Transition::Complete, T0 + 20 * M, &LifecycleRules::default())
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: AppointmentStatus::Paused,
                action: "complete"
            }
        );
    }

    #[test]
    fn test_pause_requires_pausable_service() {
        let appt = appointment(AppointmentStatus::InProgress, false);
        let err = apply(
            &appt,
            &Transition::Pause { reason: None },
            T0,
            &LifecycleRules::default(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::PauseNotSupported);
    }

    #[test]
    fn test_pause_from_pending_is_invalid() {
        let appt = appointment(AppointmentStatus::Pending, true);
        let err = apply(
            &appt,
            &Transition::Pause { reason: None },
            T0,
            &LifecycleRules::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn test_cancel_respects_lead_time() {
        let rules = LifecycleRules::default();
        let appt = appointment(AppointmentStatus::Confirmed, false);
        let cancel = Transition::Cancel {
            actor: 77,
            reason: Some("sick".into()),
        };

        let three_hours_before = T0 - 180 * M;
        let state = apply(&appt, &cancel, three_hours_before, &rules).unwrap();
        assert_eq!(state.status, AppointmentStatus::Cancelled);
        assert_eq!(state.cancelled_by, Some(77));
        assert_eq!(state.cancellation_reason.as_deref(), Some("sick"));

        let one_hour_before = T0 - 60 * M;
        assert_eq!(
            apply(&appt, &cancel, one_hour_before, &rules).unwrap_err(),
            DomainError::CancellationWindowClosed { lead_minutes: 120 }
        );

        // exactly at the deadline is too late
        assert!(apply(&appt, &cancel, T0 - 120 * M, &rules).is_err());
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let rules = LifecycleRules::default();
        for status in [
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
            AppointmentStatus::Rescheduled,
        ] {
            let appt = appointment(status, true);
            for t in [
                Transition::Confirm,
                Transition::Start,
                Transition::Resume,
                Transition::Complete,
                Transition::NoShow,
                Transition::Reschedule,
                Transition::Cancel {
                    actor: 1,
                    reason: None,
                },
            ] {
                assert!(apply(&appt, &t, T0 - 600 * M, &rules).is_err(), "{status} {t:?}");
            }
        }
    }

    #[test]
    fn test_no_show_and_reschedule_sources() {
        let rules = LifecycleRules::default();
        let early = T0 - 600 * M;
        let confirmed = appointment(AppointmentStatus::Confirmed, false);
        assert_eq!(
            apply(&confirmed, &Transition::NoShow, T0 + 20 * M, &rules).unwrap().status,
            AppointmentStatus::NoShow
        );
        assert_eq!(
            apply(&confirmed, &Transition::Reschedule, early, &rules).unwrap().status,
            AppointmentStatus::Rescheduled
        );
        let started = appointment(AppointmentStatus::InProgress, false);
        assert!(apply(&started, &Transition::NoShow, early, &rules).is_err());
        assert!(apply(&started, &Transition::Reschedule, early, &rules).is_err());
    }

    #[test]
    fn test_to_status_mapping() {
        use AppointmentStatus::*;
        assert_eq!(
            Transition::to_status(Paused, InProgress, 1, None).unwrap(),
            Transition::Resume
        );
        assert_eq!(
            Transition::to_status(Confirmed, InProgress, 1, None).unwrap(),
            Transition::Start
        );
        assert!(Transition::to_status(Confirmed, Pending, 1, None).is_err());
    }
}
