use tracing::warn;
use uuid::Uuid;

use shared_models::auth::{Actor, Role};

use crate::models::AppointmentError;

/// The two parties attached to an appointment, both as user ids.
/// `doctor_user_id` is `None` when the doctor record no longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owners {
    pub patient_id: Uuid,
    pub doctor_user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Cancel,
    UpdateStatus,
    MarkNoShow,
    RecordPayment,
    ViewStats,
}

impl Action {
    fn denied_message(&self) -> &'static str {
        match self {
            Action::View => "Not authorized to view this appointment",
            Action::Cancel => "Not authorized to cancel this appointment",
            Action::UpdateStatus => "Not authorized to update this appointment",
            Action::MarkNoShow => "Not authorized to mark this appointment as no-show",
            Action::RecordPayment => "Not authorized to record payment for this appointment",
            Action::ViewStats => "Access denied. admin role required",
        }
    }
}

/// Single decision point for who may do what with an appointment.
/// `owners` is `None` for actions that are not scoped to one appointment.
pub fn authorize(actor: &Actor, owners: Option<&Owners>, action: Action) -> Result<(), AppointmentError> {
    let is_patient = owners.is_some_and(|o| actor.is(Role::Patient) && actor.id == o.patient_id);
    let is_doctor = owners.is_some_and(|o| actor.is(Role::Doctor) && o.doctor_user_id == Some(actor.id));
    let is_admin = actor.is(Role::Admin);

    let allowed = match action {
        Action::View => is_patient || is_doctor || is_admin,
        Action::Cancel => is_patient || is_doctor,
        Action::UpdateStatus => is_doctor,
        Action::MarkNoShow | Action::RecordPayment => is_doctor || is_admin,
        Action::ViewStats => is_admin,
    };

    if allowed {
        Ok(())
    } else {
        warn!("{} {} denied {:?}", actor.role, actor.id, action);
        Err(AppointmentError::Forbidden(action.denied_message().to_string()))
    }
}

pub fn require_role(actor: &Actor, role: Role) -> Result<(), AppointmentError> {
    if actor.is(role) {
        Ok(())
    } else {
        Err(AppointmentError::Forbidden(format!("Access denied. {} role required", role)))
    }
}
