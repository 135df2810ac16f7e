use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use doctor_cell::models::{Doctor, DoctorError};
use shared_models::error::AppError;
use shared_models::pagination::{PageRequest, Pagination};

pub const SLOT_MINUTES: u32 = 30;
pub const MAX_REASON_LENGTH: usize = 200;
pub const MAX_SYMPTOMS_LENGTH: usize = 500;
pub const MAX_NOTES_LENGTH: usize = 1000;
pub const MAX_PRESCRIPTION_LENGTH: usize = 1000;
pub const MAX_CANCELLATION_REASON_LENGTH: usize = 500;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: SlotTime,
    pub status: AppointmentStatus,
    pub reason: String,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub prescription: Option<String>,
    pub consultation_fee: f64,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub cancelled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// New `scheduled` booking carrying the doctor's current fee.
    pub fn new(
        patient_id: Uuid,
        doctor: &Doctor,
        request: &BookAppointmentRequest,
        slot: SlotTime,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id: doctor.id,
            appointment_date: request.appointment_date,
            appointment_time: slot,
            status: AppointmentStatus::Scheduled,
            reason: request.reason.trim().to_string(),
            symptoms: request.symptoms.clone(),
            notes: None,
            prescription: None,
            consultation_fee: doctor.consultation_fee,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            cancelled_by: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn occupies_slot(&self, doctor_id: Uuid, date: NaiveDate, time: SlotTime) -> bool {
        self.status.is_active()
            && self.doctor_id == doctor_id
            && self.appointment_date == date
            && self.appointment_time == time
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    #[serde(alias = "no_show")]
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
        }
    }

    /// Statuses that hold the slot.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Online,
    Insurance,
}

/// Start of a bookable slot. Slots are `SLOT_MINUTES` long and aligned to
/// the hour, so only `HH:00` and `HH:30` are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn parse(value: &str) -> Result<Self, AppointmentError> {
        let trimmed = value.trim();
        let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map_err(|_| {
                AppointmentError::Validation(format!(
                    "Invalid appointment time '{}', expected HH:MM",
                    value
                ))
            })?;

        Self::from_time(time)
    }

    pub fn from_time(time: NaiveTime) -> Result<Self, AppointmentError> {
        if time.minute() % SLOT_MINUTES != 0 || time.second() != 0 || time.nanosecond() != 0 {
            return Err(AppointmentError::Validation(format!(
                "Appointment time must fall on a {}-minute boundary",
                SLOT_MINUTES
            )));
        }
        Ok(Self(time))
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for SlotTime {
    type Err = AppointmentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// Postgres `time` columns come back as `HH:MM:SS`.
impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        SlotTime::parse(&value).map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    #[serde(alias = "doctorId")]
    pub doctor_id: Uuid,
    #[serde(alias = "appointmentDate")]
    pub appointment_date: NaiveDate,
    #[serde(alias = "appointmentTime")]
    pub appointment_time: String,
    #[serde(default)]
    pub reason: String,
    pub symptoms: Option<String>,
}

impl BookAppointmentRequest {
    /// Checks the payload against field limits and returns the parsed slot.
    /// `now` is UTC wall-clock time; slots are compared against it as UTC.
    pub fn validate(&self, now: NaiveDateTime) -> Result<SlotTime, AppointmentError> {
        if self.reason.trim().is_empty() {
            return Err(AppointmentError::Validation(
                "Please provide reason for appointment".to_string(),
            ));
        }
        check_length("Reason", Some(&self.reason), MAX_REASON_LENGTH)?;
        check_length("Symptoms", self.symptoms.as_ref(), MAX_SYMPTOMS_LENGTH)?;

        let slot = SlotTime::parse(&self.appointment_time)?;

        if self.appointment_date.and_time(slot.time()) <= now {
            return Err(AppointmentError::Validation(
                "Appointment must be scheduled in the future".to_string(),
            ));
        }

        Ok(slot)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub prescription: Option<String>,
    #[serde(alias = "cancellationReason")]
    pub cancellation_reason: Option<String>,
}

impl UpdateStatusRequest {
    /// Turns the free-form status update into the command for its target.
    pub fn into_command(
        self,
        from: AppointmentStatus,
        actor_id: Uuid,
    ) -> Result<AppointmentCommand, AppointmentError> {
        let UpdateStatusRequest { status, notes, prescription, cancellation_reason } = self;

        if prescription.is_some()
            && matches!(status, AppointmentStatus::Cancelled | AppointmentStatus::NoShow)
        {
            return Err(AppointmentError::Validation(format!(
                "A prescription cannot be recorded on a {} appointment",
                status
            )));
        }

        let command = match status {
            AppointmentStatus::Scheduled => {
                return Err(AppointmentError::InvalidTransition { from, to: status });
            }
            AppointmentStatus::Confirmed => AppointmentCommand::Confirm { notes, prescription },
            AppointmentStatus::Completed => AppointmentCommand::Complete { notes, prescription },
            AppointmentStatus::Cancelled => AppointmentCommand::Cancel {
                cancelled_by: actor_id,
                reason: cancellation_reason.or(notes),
            },
            AppointmentStatus::NoShow => AppointmentCommand::NoShow { notes },
        };

        command.validate()?;
        Ok(command)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    #[serde(default, alias = "cancellationReason")]
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoShowRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    #[serde(alias = "paymentStatus")]
    pub payment_status: PaymentStatus,
    #[serde(alias = "paymentMethod")]
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientAppointmentsQuery {
    pub status: Option<AppointmentStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorAppointmentsQuery {
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn check_length(field: &str, value: Option<&String>, max: usize) -> Result<(), AppointmentError> {
    if value.is_some_and(|text| text.chars().count() > max) {
        return Err(AppointmentError::Validation(format!(
            "{} cannot exceed {} characters",
            field, max
        )));
    }
    Ok(())
}

// ==============================================================================
// UPDATE PAYLOADS
// ==============================================================================

/// A requested lifecycle step. Each variant carries only the fields that
/// step is allowed to write.
#[derive(Debug, Clone, PartialEq)]
pub enum AppointmentCommand {
    Confirm { notes: Option<String>, prescription: Option<String> },
    Complete { notes: Option<String>, prescription: Option<String> },
    Cancel { cancelled_by: Uuid, reason: Option<String> },
    NoShow { notes: Option<String> },
}

impl AppointmentCommand {
    pub fn target_status(&self) -> AppointmentStatus {
        match self {
            AppointmentCommand::Confirm { .. } => AppointmentStatus::Confirmed,
            AppointmentCommand::Complete { .. } => AppointmentStatus::Completed,
            AppointmentCommand::Cancel { .. } => AppointmentStatus::Cancelled,
            AppointmentCommand::NoShow { .. } => AppointmentStatus::NoShow,
        }
    }

    pub fn validate(&self) -> Result<(), AppointmentError> {
        match self {
            AppointmentCommand::Confirm { notes, prescription }
            | AppointmentCommand::Complete { notes, prescription } => {
                check_length("Notes", notes.as_ref(), MAX_NOTES_LENGTH)?;
                check_length("Prescription", prescription.as_ref(), MAX_PRESCRIPTION_LENGTH)
            }
            AppointmentCommand::Cancel { reason, .. } => {
                check_length("Cancellation reason", reason.as_ref(), MAX_CANCELLATION_REASON_LENGTH)
            }
            AppointmentCommand::NoShow { notes } => {
                check_length("Notes", notes.as_ref(), MAX_NOTES_LENGTH)
            }
        }
    }
}

/// Whitelisted write applied to a stored appointment under a status guard.
#[derive(Debug, Clone, PartialEq)]
pub enum AppointmentPatch {
    Transition(AppointmentCommand),
    Payment {
        expected: PaymentStatus,
        status: PaymentStatus,
        method: Option<PaymentMethod>,
    },
}

impl AppointmentPatch {
    pub fn apply(&self, appointment: &mut Appointment, now: DateTime<Utc>) {
        match self {
            AppointmentPatch::Transition(command) => {
                appointment.status = command.target_status();
                match command {
                    AppointmentCommand::Confirm { notes, prescription }
                    | AppointmentCommand::Complete { notes, prescription } => {
                        if notes.is_some() {
                            appointment.notes = notes.clone();
                        }
                        if prescription.is_some() {
                            appointment.prescription = prescription.clone();
                        }
                    }
                    AppointmentCommand::Cancel { cancelled_by, reason } => {
                        appointment.cancelled_by = Some(*cancelled_by);
                        appointment.cancellation_reason = reason.clone();
                    }
                    AppointmentCommand::NoShow { notes } => {
                        if notes.is_some() {
                            appointment.notes = notes.clone();
                        }
                    }
                }
            }
            AppointmentPatch::Payment { status, method, .. } => {
                appointment.payment_status = *status;
                if method.is_some() {
                    appointment.payment_method = *method;
                }
            }
        }
        appointment.updated_at = now;
    }

    /// Column values for a PostgREST PATCH; untouched columns are left out.
    pub fn to_row(&self, now: DateTime<Utc>) -> Value {
        let mut row = Map::new();

        match self {
            AppointmentPatch::Transition(command) => {
                row.insert("status".to_string(), json!(command.target_status()));
                match command {
                    AppointmentCommand::Confirm { notes, prescription }
                    | AppointmentCommand::Complete { notes, prescription } => {
                        if let Some(notes) = notes {
                            row.insert("notes".to_string(), json!(notes));
                        }
                        if let Some(prescription) = prescription {
                            row.insert("prescription".to_string(), json!(prescription));
                        }
                    }
                    AppointmentCommand::Cancel { cancelled_by, reason } => {
                        row.insert("cancelled_by".to_string(), json!(cancelled_by));
                        row.insert("cancellation_reason".to_string(), json!(reason));
                    }
                    AppointmentCommand::NoShow { notes } => {
                        if let Some(notes) = notes {
                            row.insert("notes".to_string(), json!(notes));
                        }
                    }
                }
            }
            AppointmentPatch::Payment { status, method, .. } => {
                row.insert("payment_status".to_string(), json!(status));
                if let Some(method) = method {
                    row.insert("payment_method".to_string(), json!(method));
                }
            }
        }

        row.insert("updated_at".to_string(), json!(now.to_rfc3339()));
        Value::Object(row)
    }
}

// ==============================================================================
// RESULT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentPage {
    pub items: Vec<Appointment>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

impl AppointmentPage {
    pub fn new(items: Vec<Appointment>, request: PageRequest, total: u64) -> Self {
        let pagination = Pagination::new(request, total);
        Self {
            items,
            total,
            page: pagination.page,
            limit: pagination.limit,
            pages: pagination.pages,
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total: self.total,
            pages: self.pages,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentStats {
    pub total: u64,
    pub scheduled: u64,
    pub confirmed: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub no_show: u64,
    pub paid_revenue: f64,
}

impl AppointmentStats {
    pub fn record(&mut self, status: AppointmentStatus, count: u64) {
        match status {
            AppointmentStatus::Scheduled => self.scheduled += count,
            AppointmentStatus::Confirmed => self.confirmed += count,
            AppointmentStatus::Completed => self.completed += count,
            AppointmentStatus::Cancelled => self.cancelled += count,
            AppointmentStatus::NoShow => self.no_show += count,
        }
        self.total += count;
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor profile not found")]
    DoctorProfileNotFound,

    #[error("This time slot is already booked")]
    SlotUnavailable,

    #[error("{0}")]
    Forbidden(String),

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Cannot change payment status from {from} to {to}")]
    InvalidPaymentTransition { from: PaymentStatus, to: PaymentStatus },

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DoctorError> for AppointmentError {
    fn from(error: DoctorError) -> Self {
        match error {
            DoctorError::NotFound => AppointmentError::DoctorNotFound,
            DoctorError::ProfileNotFound => AppointmentError::DoctorProfileNotFound,
            DoctorError::ProfileExists => AppointmentError::Validation(error.to_string()),
            DoctorError::Validation(msg) => AppointmentError::Validation(msg),
            DoctorError::Database(msg) => AppointmentError::Database(msg),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::NotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::DoctorProfileNotFound => AppError::NotFound(error.to_string()),
            AppointmentError::SlotUnavailable => AppError::Conflict(error.to_string()),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::InvalidTransition { .. }
            | AppointmentError::InvalidPaymentTransition { .. } => AppError::BadRequest(error.to_string()),
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::Database(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn booking(date: NaiveDate, time: &str) -> BookAppointmentRequest {
        BookAppointmentRequest {
            doctor_id: Uuid::new_v4(),
            appointment_date: date,
            appointment_time: time.to_string(),
            reason: "checkup".to_string(),
            symptoms: None,
        }
    }

    fn tomorrow() -> NaiveDate {
        (Utc::now() + Duration::days(1)).date_naive()
    }

    #[test]
    fn test_slot_time_accepts_half_hours() {
        assert_eq!(SlotTime::parse("10:00").unwrap().to_string(), "10:00");
        assert_eq!(SlotTime::parse("09:30:00").unwrap().to_string(), "09:30");
        assert_matches!(SlotTime::parse("10:15"), Err(AppointmentError::Validation(_)));
        assert_matches!(SlotTime::parse("ten"), Err(AppointmentError::Validation(_)));
    }

    #[test]
    fn test_slot_time_serde() {
        let slot: SlotTime = serde_json::from_value(json!("14:30:00")).unwrap();
        assert_eq!(serde_json::to_value(slot).unwrap(), json!("14:30"));
        assert!(serde_json::from_value::<SlotTime>(json!("14:10")).is_err());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_value(AppointmentStatus::NoShow).unwrap(), json!("no-show"));
        let status: AppointmentStatus = serde_json::from_value(json!("no_show")).unwrap();
        assert_eq!(status, AppointmentStatus::NoShow);
        assert!(AppointmentStatus::Confirmed.is_active());
        assert!(!AppointmentStatus::Completed.is_active());
    }

    #[test]
    fn test_booking_request_accepts_camel_case() {
        let request: BookAppointmentRequest = serde_json::from_value(json!({
            "doctorId": Uuid::new_v4(),
            "appointmentDate": "2030-03-01",
            "appointmentTime": "10:00",
            "reason": "checkup"
        }))
        .unwrap();
        assert_eq!(request.appointment_time, "10:00");
        assert!(request.symptoms.is_none());
    }

    #[test]
    fn test_booking_validation() {
        let now = Utc::now().naive_utc();

        assert!(booking(tomorrow(), "10:00").validate(now).is_ok());

        let mut blank = booking(tomorrow(), "10:00");
        blank.reason = "   ".to_string();
        assert_matches!(blank.validate(now), Err(AppointmentError::Validation(_)));

        let mut long = booking(tomorrow(), "10:00");
        long.reason = "x".repeat(MAX_REASON_LENGTH + 1);
        assert_matches!(long.validate(now), Err(AppointmentError::Validation(_)));

        let mut symptoms = booking(tomorrow(), "10:00");
        symptoms.symptoms = Some("x".repeat(MAX_SYMPTOMS_LENGTH + 1));
        assert_matches!(symptoms.validate(now), Err(AppointmentError::Validation(_)));

        let yesterday = (Utc::now() - Duration::days(1)).date_naive();
        assert_matches!(
            booking(yesterday, "10:00").validate(now),
            Err(AppointmentError::Validation(msg)) if msg.contains("future")
        );
    }

    #[test]
    fn test_update_request_into_command() {
        let actor = Uuid::new_v4();
        let request = UpdateStatusRequest {
            status: AppointmentStatus::Cancelled,
            notes: Some("clinic closed".to_string()),
            prescription: None,
            cancellation_reason: None,
        };

        let command = request.into_command(AppointmentStatus::Scheduled, actor).unwrap();
        assert_eq!(
            command,
            AppointmentCommand::Cancel { cancelled_by: actor, reason: Some("clinic closed".to_string()) }
        );
    }

    #[test]
    fn test_update_request_rejects_scheduled_target_and_prescription_on_cancel() {
        let to_scheduled = UpdateStatusRequest {
            status: AppointmentStatus::Scheduled,
            notes: None,
            prescription: None,
            cancellation_reason: None,
        };
        assert_matches!(
            to_scheduled.into_command(AppointmentStatus::Confirmed, Uuid::new_v4()),
            Err(AppointmentError::InvalidTransition {
                from: AppointmentStatus::Confirmed,
                to: AppointmentStatus::Scheduled
            })
        );

        let prescription_on_no_show = UpdateStatusRequest {
            status: AppointmentStatus::NoShow,
            notes: None,
            prescription: Some("rest".to_string()),
            cancellation_reason: None,
        };
        assert_matches!(
            prescription_on_no_show.into_command(AppointmentStatus::Scheduled, Uuid::new_v4()),
            Err(AppointmentError::Validation(_))
        );
    }

    #[test]
    fn test_cancel_patch_row_and_apply() {
        let actor = Uuid::new_v4();
        let now = Utc::now();
        let patch = AppointmentPatch::Transition(AppointmentCommand::Cancel {
            cancelled_by: actor,
            reason: Some("travel".to_string()),
        });

        let row = patch.to_row(now);
        assert_eq!(row["status"], "cancelled");
        assert_eq!(row["cancelled_by"], json!(actor));
        assert_eq!(row["cancellation_reason"], "travel");
        assert!(row.get("notes").is_none());

        let mut appointment: Appointment = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "doctor_id": Uuid::new_v4(),
            "appointment_date": "2030-03-01",
            "appointment_time": "10:00:00",
            "status": "scheduled",
            "reason": "checkup",
            "symptoms": null,
            "notes": null,
            "prescription": null,
            "consultation_fee": 100.0,
            "payment_status": "pending",
            "payment_method": null,
            "cancelled_by": null,
            "cancellation_reason": null,
            "created_at": "2030-01-01T00:00:00Z",
            "updated_at": "2030-01-01T00:00:00Z"
        }))
        .unwrap();

        patch.apply(&mut appointment, now);
        assert_eq!(appointment.status, AppointmentStatus::Cancelled);
        assert_eq!(appointment.cancelled_by, Some(actor));
        assert_eq!(appointment.consultation_fee, 100.0);
        assert_eq!(appointment.updated_at, now);
    }

    #[test]
    fn test_page_count() {
        let page = AppointmentPage::new(vec![], PageRequest::new(Some(3), Some(10)).unwrap(), 25);
        assert_eq!(page.pages, 3);
        assert_eq!(page.pagination().total, 25);
    }

    #[test]
    fn test_error_mapping() {
        assert_matches!(AppError::from(AppointmentError::SlotUnavailable), AppError::Conflict(msg) if msg == "This time slot is already booked");
        assert_matches!(AppError::from(AppointmentError::DoctorNotFound), AppError::NotFound(msg) if msg == "Doctor not found");
        assert_matches!(
            AppError::from(AppointmentError::InvalidTransition {
                from: AppointmentStatus::Completed,
                to: AppointmentStatus::Cancelled
            }),
            AppError::BadRequest(msg) if msg == "Cannot change appointment status from completed to cancelled"
        );
        assert_matches!(AppointmentError::from(DoctorError::ProfileNotFound), AppointmentError::DoctorProfileNotFound);
    }
}
