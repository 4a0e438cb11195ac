//! Capability policy
//!
//! Every handler asks one question: may this [`Actor`] perform this
//! [`Action`] on this [`Target`]? Role permission strings answer it. An
//! unscoped permission (`appointments:read`) covers every target; a scoped
//! one (`appointments:read:own`) only targets linked to the actor's own
//! barber or client profile.

use shared::models::Role;

use super::permissions;
use crate::AppError;
use crate::security_log;

/// Authenticated caller, resolved once per request
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub permissions: Vec<String>,
    /// Barber profile linked to the account
    pub barber_id: Option<i64>,
    /// Client profile linked to the account
    pub client_id: Option<i64>,
}

impl Actor {
    pub fn new(
        user_id: i64,
        email: impl Into<String>,
        role: Role,
        barber_id: Option<i64>,
        client_id: Option<i64>,
    ) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
            permissions: permissions::get_default_permissions(role),
            barber_id,
            client_id,
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        permissions::has_permission(&self.permissions, permission)
    }

    /// Admin or manager
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Manager)
    }

    fn owns(&self, target: &Target) -> bool {
        match *target {
            Target::Any => false,
            Target::Appointment {
                barber_id,
                client_id,
            } => self.barber_id == Some(barber_id) || self.client_id == Some(client_id),
            Target::Barber(id) => self.barber_id == Some(id),
            Target::Client(id) => self.client_id == Some(id),
            Target::OwnClientProfile => self.role == Role::Client,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AppointmentCreate,
    AppointmentRead,
    AppointmentUpdate,
    AppointmentStatus,
    AppointmentCancel,
    BarberRead,
    BarberManage,
    ServiceRead,
    ServiceManage,
    ClientRead,
    ClientManage,
    BlockRead,
    BlockManage,
    CommissionRead,
    CommissionManage,
}

impl Action {
    pub fn permission(&self) -> &'static str {
        match self {
            Self::AppointmentCreate => "appointments:create",
            Self::AppointmentRead => "appointments:read",
            Self::AppointmentUpdate => "appointments:update",
            Self::AppointmentStatus => "appointments:status",
            Self::AppointmentCancel => "appointments:cancel",
            Self::BarberRead => "barbers:read",
            Self::BarberManage => "barbers:manage",
            Self::ServiceRead => "services:read",
            Self::ServiceManage => "services:manage",
            Self::ClientRead => "clients:read",
            Self::ClientManage => "clients:manage",
            Self::BlockRead => "blocks:read",
            Self::BlockManage => "blocks:manage",
            Self::CommissionRead => "commissions:read",
            Self::CommissionManage => "commissions:manage",
        }
    }
}

/// Resource an action applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Collection-level or unowned resource
    Any,
    Appointment { barber_id: i64, client_id: i64 },
    Barber(i64),
    Client(i64),
    /// The caller's own client profile, created on first booking if missing
    OwnClientProfile,
}

/// Which appointments a caller may list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentScope {
    All,
    Barber(i64),
    Client(i64),
}

pub struct Policy;

impl Policy {
    pub fn allows(actor: &Actor, action: Action, target: Target) -> bool {
        let permission = action.permission();
        if actor.has_permission(permission) {
            return true;
        }
        actor.has_permission(&format!("{permission}:own")) && actor.owns(&target)
    }

    /// Allow or fail with 403
    pub fn authorize(actor: &Actor, action: Action, target: Target) -> Result<(), AppError> {
        if Self::allows(actor, action, target) {
            return Ok(());
        }
        security_log!(
            "WARN",
            "permission_denied",
            user_id = actor.user_id,
            role = actor.role.as_str(),
            required_permission = action.permission()
        );
        Err(AppError::forbidden(format!(
            "Permission denied: {}",
            action.permission()
        )))
    }

    /// Listing scope for appointments
    pub fn appointment_scope(actor: &Actor) -> Result<AppointmentScope, AppError> {
        if actor.has_permission(Action::AppointmentRead.permission()) {
            return Ok(AppointmentScope::All);
        }
        if actor.has_permission("appointments:read:own") {
            if let Some(id) = actor.barber_id {
                return Ok(AppointmentScope::Barber(id));
            }
            if let Some(id) = actor.client_id {
                return Ok(AppointmentScope::Client(id));
            }
        }
        Err(AppError::forbidden("Permission denied: appointments:read"))
    }
}
