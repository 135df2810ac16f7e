use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use doctor_cell::test_utils::InMemoryDoctorDirectory;
use shared_models::pagination::PageRequest;

use crate::models::{
    Appointment, AppointmentError, AppointmentPage, AppointmentPatch, AppointmentStats,
    AppointmentStatus, PaymentStatus, SlotTime,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::ledger::{guard_failure, AppointmentLedger};

/// Ledger kept in a map. Inserts and updates run under one write lock, which
/// gives the same slot guarantee as the database's partial unique index.
#[derive(Default)]
pub struct InMemoryAppointmentLedger {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }

    /// Same tie-breakers as the PostgREST `order` clauses.
    fn listing_key(a: &Appointment) -> (NaiveDate, SlotTime, DateTime<Utc>, Uuid) {
        (a.appointment_date, a.appointment_time, a.created_at, a.id)
    }

    fn page(items: Vec<Appointment>, page: PageRequest) -> AppointmentPage {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        AppointmentPage::new(items, page, total)
    }
}

#[async_trait]
impl AppointmentLedger for InMemoryAppointmentLedger {
    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;

        let taken = appointment.status.is_active()
            && appointments.values().any(|existing| {
                existing.occupies_slot(
                    appointment.doctor_id,
                    appointment.appointment_date,
                    appointment.appointment_time,
                )
            });
        if taken {
            return Err(AppointmentError::SlotUnavailable);
        }

        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn find_by_id(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.appointments
            .read()
            .await
            .get(&appointment_id)
            .cloned()
            .ok_or(AppointmentError::NotFound)
    }

    async fn query_by_patient(
        &self,
        patient_id: Uuid,
        status: Option<AppointmentStatus>,
        page: PageRequest,
    ) -> Result<AppointmentPage, AppointmentError> {
        let mut items: Vec<Appointment> = self.appointments
            .read()
            .await
            .values()
            .filter(|a| a.patient_id == patient_id)
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();

        items.sort_by(|a, b| Self::listing_key(b).cmp(&Self::listing_key(a)));
        Ok(Self::page(items, page))
    }

    async fn query_by_doctor(
        &self,
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
        date: Option<NaiveDate>,
        page: PageRequest,
    ) -> Result<AppointmentPage, AppointmentError> {
        let mut items: Vec<Appointment> = self.appointments
            .read()
            .await
            .values()
            .filter(|a| a.doctor_id == doctor_id)
            .filter(|a| status.map_or(true, |s| a.status == s))
            .filter(|a| date.map_or(true, |d| a.appointment_date == d))
            .cloned()
            .collect();

        items.sort_by_key(Self::listing_key);
        Ok(Self::page(items, page))
    }

    async fn update(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        patch: &AppointmentPatch,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(AppointmentError::NotFound)?;

        let payment_matches = match patch {
            AppointmentPatch::Payment { expected, .. } => appointment.payment_status == *expected,
            AppointmentPatch::Transition(_) => true,
        };
        if appointment.status != expected || !payment_matches {
            return Err(guard_failure(appointment, patch));
        }

        patch.apply(appointment, Utc::now());
        Ok(appointment.clone())
    }

    async fn stats(&self) -> Result<AppointmentStats, AppointmentError> {
        let appointments = self.appointments.read().await;

        let mut stats = AppointmentStats::default();
        for appointment in appointments.values() {
            stats.record(appointment.status, 1);
            if appointment.payment_status == PaymentStatus::Paid {
                stats.paid_revenue += appointment.consultation_fee;
            }
        }
        Ok(stats)
    }
}

/// Workflow wired to in-memory stores, with handles kept for seeding and inspection.
pub struct InMemoryBooking {
    pub ledger: Arc<InMemoryAppointmentLedger>,
    pub doctors: Arc<InMemoryDoctorDirectory>,
    pub service: Arc<AppointmentBookingService>,
}

impl InMemoryBooking {
    pub fn new() -> Self {
        let ledger = Arc::new(InMemoryAppointmentLedger::new());
        let doctors = Arc::new(InMemoryDoctorDirectory::new());
        let service = Arc::new(AppointmentBookingService::with_stores(
            ledger.clone(),
            doctors.clone(),
        ));
        Self { ledger, doctors, service }
    }
}

impl Default for InMemoryBooking {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    use crate::models::{AppointmentCommand, BookAppointmentRequest, SlotTime};

    fn appointment(doctor_id: Uuid, date: NaiveDate, time: &str) -> Appointment {
        let doctor = InMemoryDoctorDirectory::sample_doctor(Uuid::new_v4(), 100.0);
        let doctor = doctor_cell::models::Doctor { id: doctor_id, ..doctor };
        let request = BookAppointmentRequest {
            doctor_id,
            appointment_date: date,
            appointment_time: time.to_string(),
            reason: "checkup".to_string(),
            symptoms: None,
        };
        let slot = SlotTime::parse(time).unwrap();
        Appointment::new(Uuid::new_v4(), &doctor, &request, slot, Utc::now())
    }

    fn next_week() -> NaiveDate {
        (Utc::now() + Duration::days(7)).date_naive()
    }

    #[test]
    fn test_insert_rejects_second_active_booking() {
        tokio_test::block_on(async {
            let ledger = InMemoryAppointmentLedger::new();
            let doctor_id = Uuid::new_v4();

            ledger.insert(&appointment(doctor_id, next_week(), "10:00")).await.unwrap();
            assert_matches!(
                ledger.insert(&appointment(doctor_id, next_week(), "10:00")).await,
                Err(AppointmentError::SlotUnavailable)
            );
            ledger.insert(&appointment(doctor_id, next_week(), "10:30")).await.unwrap();
            assert_eq!(ledger.len().await, 2);
        });
    }

    #[test]
    fn test_update_is_guarded_by_expected_status() {
        tokio_test::block_on(async {
            let ledger = InMemoryAppointmentLedger::new();
            let stored = ledger.insert(&appointment(Uuid::new_v4(), next_week(), "11:00")).await.unwrap();
            let confirm = AppointmentPatch::Transition(AppointmentCommand::Confirm {
                notes: None,
                prescription: None,
            });

            assert_matches!(
                ledger.update(stored.id, AppointmentStatus::Confirmed, &confirm).await,
                Err(AppointmentError::InvalidTransition {
                    from: AppointmentStatus::Scheduled,
                    to: AppointmentStatus::Confirmed
                })
            );
            let updated = ledger.update(stored.id, AppointmentStatus::Scheduled, &confirm).await.unwrap();
            assert_eq!(updated.status, AppointmentStatus::Confirmed);

            assert_matches!(
                ledger.update(Uuid::new_v4(), AppointmentStatus::Scheduled, &confirm).await,
                Err(AppointmentError::NotFound)
            );
        });
    }
}
