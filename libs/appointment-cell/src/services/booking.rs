use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use doctor_cell::services::{DoctorDirectory, DoctorService};
use shared_config::AppConfig;
use shared_models::auth::{Actor, Role};
use shared_models::pagination::PageRequest;

use crate::models::{
    Appointment, AppointmentCommand, AppointmentError, AppointmentPage, AppointmentPatch,
    AppointmentStats, AppointmentStatus, BookAppointmentRequest, CancelAppointmentRequest,
    NoShowRequest, RecordPaymentRequest, UpdateStatusRequest,
};
use crate::services::authorization::{authorize, require_role, Action, Owners};
use crate::services::ledger::{AppointmentLedger, SupabaseAppointmentLedger};
use crate::services::lifecycle;

/// Booking and lifecycle workflow. Holds no per-request state; every call
/// takes the acting user explicitly.
pub struct AppointmentBookingService {
    ledger: Arc<dyn AppointmentLedger>,
    doctors: Arc<dyn DoctorDirectory>,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            ledger: Arc::new(SupabaseAppointmentLedger::new(config)),
            doctors: Arc::new(DoctorService::new(config)),
        }
    }

    pub fn with_stores(ledger: Arc<dyn AppointmentLedger>, doctors: Arc<dyn DoctorDirectory>) -> Self {
        Self { ledger, doctors }
    }

    /// A missing doctor record leaves the appointment without an owning
    /// doctor; the patient and admins keep their access.
    async fn owners(&self, appointment: &Appointment) -> Result<Owners, AppointmentError> {
        let doctor_user_id = match self.doctors.get_by_id(appointment.doctor_id).await {
            Ok(doctor) => Some(doctor.user_id),
            Err(DoctorError::NotFound) => {
                warn!("Appointment {} references missing doctor {}", appointment.id, appointment.doctor_id);
                None
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Owners {
            patient_id: appointment.patient_id,
            doctor_user_id,
        })
    }

    async fn load_for(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        action: Action,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.ledger.find_by_id(appointment_id).await?;
        let owners = self.owners(&appointment).await?;
        authorize(actor, Some(&owners), action)?;
        Ok(appointment)
    }

    async fn transition(
        &self,
        actor: &Actor,
        appointment: &Appointment,
        command: AppointmentCommand,
    ) -> Result<Appointment, AppointmentError> {
        let target = command.target_status();
        lifecycle::check_transition(appointment.status, target, actor.role)?;

        let updated = self.ledger
            .update(appointment.id, appointment.status, &AppointmentPatch::Transition(command))
            .await?;

        info!(
            "Appointment {} moved {} -> {} by {} {}",
            appointment.id, appointment.status, updated.status, actor.role, actor.id
        );
        Ok(updated)
    }

    /// Books a slot for the calling patient. The ledger's uniqueness rule is
    /// the only availability check, so concurrent bookings cannot both win.
    pub async fn create_appointment(
        &self,
        actor: &Actor,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        require_role(actor, Role::Patient)?;

        let now = Utc::now();
        let slot = request.validate(now.naive_utc())?;

        let doctor = self.doctors.get_by_id(request.doctor_id).await?;

        info!(
            "Booking doctor {} on {} at {} for patient {}",
            doctor.id, request.appointment_date, slot, actor.id
        );

        let appointment = Appointment::new(actor.id, &doctor, &request, slot, now);
        let stored = self.ledger.insert(&appointment).await?;

        info!("Appointment {} booked with fee {}", stored.id, stored.consultation_fee);
        Ok(stored)
    }

    pub async fn get_appointment(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        debug!("{} {} fetching appointment {}", actor.role, actor.id, appointment_id);
        self.load_for(actor, appointment_id, Action::View).await
    }

    pub async fn list_for_patient(
        &self,
        actor: &Actor,
        status: Option<AppointmentStatus>,
        page: PageRequest,
    ) -> Result<AppointmentPage, AppointmentError> {
        require_role(actor, Role::Patient)?;
        self.ledger.query_by_patient(actor.id, status, page).await
    }

    pub async fn list_for_doctor(
        &self,
        actor: &Actor,
        status: Option<AppointmentStatus>,
        date: Option<NaiveDate>,
        page: PageRequest,
    ) -> Result<AppointmentPage, AppointmentError> {
        require_role(actor, Role::Doctor)?;

        let doctor = self.doctors.get_by_user_id(actor.id).await?;
        self.ledger.query_by_doctor(doctor.id, status, date, page).await
    }

    pub async fn update_status(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load_for(actor, appointment_id, Action::UpdateStatus).await?;
        let command = request.into_command(appointment.status, actor.id)?;

        self.transition(actor, &appointment, command).await
    }

    pub async fn cancel_appointment(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load_for(actor, appointment_id, Action::Cancel).await?;

        let command = AppointmentCommand::Cancel {
            cancelled_by: actor.id,
            reason: request.cancellation_reason,
        };
        command.validate()?;

        self.transition(actor, &appointment, command).await
    }

    /// Administrative override for a patient who did not attend.
    pub async fn mark_no_show(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        request: NoShowRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load_for(actor, appointment_id, Action::MarkNoShow).await?;

        let command = AppointmentCommand::NoShow { notes: request.notes };
        command.validate()?;

        self.transition(actor, &appointment, command).await
    }

    /// Records payment state only; no money moves here.
    pub async fn record_payment(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        request: RecordPaymentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load_for(actor, appointment_id, Action::RecordPayment).await?;

        lifecycle::check_payment_transition(appointment.payment_status, request.payment_status)?;

        let patch = AppointmentPatch::Payment {
            expected: appointment.payment_status,
            status: request.payment_status,
            method: request.payment_method,
        };
        let updated = self.ledger.update(appointment.id, appointment.status, &patch).await?;

        info!(
            "Payment for appointment {} moved {} -> {} by {} {}",
            appointment.id, appointment.payment_status, updated.payment_status, actor.role, actor.id
        );
        Ok(updated)
    }

    pub async fn get_stats(&self, actor: &Actor) -> Result<AppointmentStats, AppointmentError> {
        authorize(actor, None, Action::ViewStats)?;
        self.ledger.stats().await
    }
}
