use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::future::try_join_all;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DatabaseError, SupabaseClient};
use shared_models::pagination::PageRequest;

use crate::models::{
    Appointment, AppointmentError, AppointmentPage, AppointmentPatch, AppointmentStats,
    AppointmentStatus,
};

/// Durable store of appointments. Implementations enforce slot exclusivity
/// on insert and guard every update with the caller's expected status.
#[async_trait]
pub trait AppointmentLedger: Send + Sync {
    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError>;

    async fn find_by_id(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError>;

    /// Newest first.
    async fn query_by_patient(
        &self,
        patient_id: Uuid,
        status: Option<AppointmentStatus>,
        page: PageRequest,
    ) -> Result<AppointmentPage, AppointmentError>;

    /// Earliest first.
    async fn query_by_doctor(
        &self,
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
        date: Option<NaiveDate>,
        page: PageRequest,
    ) -> Result<AppointmentPage, AppointmentError>;

    /// Applies `patch` only if the stored status still equals `expected`
    /// (and, for payments, the stored payment status equals the patch's).
    async fn update(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        patch: &AppointmentPatch,
    ) -> Result<Appointment, AppointmentError>;

    async fn stats(&self) -> Result<AppointmentStats, AppointmentError>;
}

/// Guard miss on `update`: report it against the record as it is now.
pub(crate) fn guard_failure(current: &Appointment, patch: &AppointmentPatch) -> AppointmentError {
    match patch {
        AppointmentPatch::Transition(command) => AppointmentError::InvalidTransition {
            from: current.status,
            to: command.target_status(),
        },
        AppointmentPatch::Payment { status, .. } => AppointmentError::InvalidPaymentTransition {
            from: current.payment_status,
            to: *status,
        },
    }
}

pub struct SupabaseAppointmentLedger {
    supabase: SupabaseClient,
}

fn database_error(error: anyhow::Error) -> AppointmentError {
    error!("Appointment storage error: {}", error);
    AppointmentError::Database(error.to_string())
}

fn parse_appointment(row: Value) -> Result<Appointment, AppointmentError> {
    serde_json::from_value(row)
        .map_err(|e| AppointmentError::Database(format!("Failed to parse appointment: {}", e)))
}

fn parse_appointments(rows: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
    rows.into_iter().map(parse_appointment).collect()
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

impl SupabaseAppointmentLedger {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn fetch_page(
        &self,
        mut query_parts: Vec<String>,
        page: PageRequest,
    ) -> Result<AppointmentPage, AppointmentError> {
        query_parts.push(format!("limit={}", page.limit));
        query_parts.push(format!("offset={}", page.offset()));

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let (rows, total): (Vec<Value>, u64) = self.supabase
            .request_with_count(&path)
            .await
            .map_err(database_error)?;

        Ok(AppointmentPage::new(parse_appointments(rows)?, page, total))
    }

    fn patient_query(patient_id: Uuid, status: Option<AppointmentStatus>) -> Vec<String> {
        let mut query_parts = vec![
            "select=*".to_string(),
            format!("patient_id=eq.{}", patient_id),
        ];
        if let Some(status) = status {
            query_parts.push(format!("status=eq.{}", status));
        }
        query_parts.push("order=appointment_date.desc,appointment_time.desc,created_at.desc,id.desc".to_string());
        query_parts
    }

    fn doctor_query(
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
        date: Option<NaiveDate>,
    ) -> Vec<String> {
        let mut query_parts = vec![
            "select=*".to_string(),
            format!("doctor_id=eq.{}", doctor_id),
        ];
        if let Some(status) = status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(date) = date {
            query_parts.push(format!("appointment_date=eq.{}", date));
        }
        query_parts.push("order=appointment_date.asc,appointment_time.asc,created_at.asc,id.asc".to_string());
        query_parts
    }
}

#[async_trait]
impl AppointmentLedger for SupabaseAppointmentLedger {
    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(appointment)
            .map_err(|e| AppointmentError::Database(format!("Failed to encode appointment: {}", e)))?;

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(body),
            Some(representation_headers()),
        ).await.map_err(|e| {
            if DatabaseError::is_unique_violation(&e) {
                warn!(
                    "Slot {} {} for doctor {} is already taken",
                    appointment.appointment_date, appointment.appointment_time, appointment.doctor_id
                );
                AppointmentError::SlotUnavailable
            } else {
                database_error(e)
            }
        })?;

        let stored = result
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Database("Failed to create appointment".to_string()))
            .and_then(parse_appointment)?;

        info!("Appointment {} stored", stored.id);
        Ok(stored)
    }

    async fn find_by_id(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}&limit=1", appointment_id);
        let result: Vec<Value> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(database_error)?;

        result
            .into_iter()
            .next()
            .ok_or(AppointmentError::NotFound)
            .and_then(parse_appointment)
    }

    async fn query_by_patient(
        &self,
        patient_id: Uuid,
        status: Option<AppointmentStatus>,
        page: PageRequest,
    ) -> Result<AppointmentPage, AppointmentError> {
        debug!("Listing appointments for patient {} (status {:?})", patient_id, status);
        self.fetch_page(Self::patient_query(patient_id, status), page).await
    }

    async fn query_by_doctor(
        &self,
        doctor_id: Uuid,
        status: Option<AppointmentStatus>,
        date: Option<NaiveDate>,
        page: PageRequest,
    ) -> Result<AppointmentPage, AppointmentError> {
        debug!("Listing appointments for doctor {} (status {:?}, date {:?})", doctor_id, status, date);
        self.fetch_page(Self::doctor_query(doctor_id, status, date), page).await
    }

    async fn update(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        patch: &AppointmentPatch,
    ) -> Result<Appointment, AppointmentError> {
        let mut path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment_id, expected
        );
        if let AppointmentPatch::Payment { expected: payment, .. } = patch {
            path.push_str(&format!("&payment_status=eq.{}", payment));
        }

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(patch.to_row(Utc::now())),
            Some(representation_headers()),
        ).await.map_err(database_error)?;

        match result.into_iter().next() {
            Some(row) => parse_appointment(row),
            None => {
                // Either the row is gone or someone changed it first.
                let current = self.find_by_id(appointment_id).await?;
                warn!("Guarded update of appointment {} missed; status is now {}", appointment_id, current.status);
                Err(guard_failure(&current, patch))
            }
        }
    }

    async fn stats(&self) -> Result<AppointmentStats, AppointmentError> {
        let counts = try_join_all(AppointmentStatus::ALL.into_iter().map(|status| {
            let path = format!("/rest/v1/appointments?select=id&status=eq.{}&limit=0", status);
            async move {
                let count = self.supabase.count(&path).await?;
                Ok::<_, anyhow::Error>((status, count))
            }
        }))
        .await
        .map_err(database_error)?;

        let paid: Vec<Value> = self.supabase
            .request(Method::GET, "/rest/v1/appointments?select=consultation_fee&payment_status=eq.paid", None)
            .await
            .map_err(database_error)?;

        let mut stats = AppointmentStats::default();
        for (status, count) in counts {
            stats.record(status, count);
        }
        stats.paid_revenue = paid
            .iter()
            .filter_map(|row| row.get("consultation_fee").and_then(Value::as_f64))
            .sum();

        Ok(stats)
    }
}
