use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveTime};

use shared_models::error::AppError;

pub const MAX_ABOUT_LENGTH: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub specialization: String,
    #[serde(default)]
    pub qualifications: Vec<Qualification>,
    pub experience_years: u32,
    pub consultation_fee: f64,
    #[serde(default)]
    pub availability: Vec<AvailabilityWindow>,
    pub hospital: Option<Hospital>,
    pub about: Option<String>,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub total_reviews: u32,
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Qualification {
    pub degree: String,
    pub institution: String,
    pub year: u16,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    #[serde(alias = "Monday")]
    Monday,
    #[serde(alias = "Tuesday")]
    Tuesday,
    #[serde(alias = "Wednesday")]
    Wednesday,
    #[serde(alias = "Thursday")]
    Thursday,
    #[serde(alias = "Friday")]
    Friday,
    #[serde(alias = "Saturday")]
    Saturday,
    #[serde(alias = "Sunday")]
    Sunday,
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        };
        write!(f, "{}", name)
    }
}

/// One entry of the weekly availability template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityWindow {
    pub day: Weekday,
    #[serde(alias = "startTime")]
    pub start_time: String,
    #[serde(alias = "endTime")]
    pub end_time: String,
    #[serde(default = "default_true", alias = "isAvailable")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

impl AvailabilityWindow {
    fn parse_time(value: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .ok()
    }

    pub fn validate(&self) -> Result<(), DoctorError> {
        let start = Self::parse_time(&self.start_time).ok_or_else(|| {
            DoctorError::Validation(format!("Invalid start time '{}' for {}", self.start_time, self.day))
        })?;
        let end = Self::parse_time(&self.end_time).ok_or_else(|| {
            DoctorError::Validation(format!("Invalid end time '{}' for {}", self.end_time, self.day))
        })?;

        if start >= end {
            return Err(DoctorError::Validation(format!(
                "Availability on {} must end after it starts",
                self.day
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hospital {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorProfileRequest {
    pub specialization: String,
    #[serde(default)]
    pub qualifications: Vec<Qualification>,
    #[serde(alias = "experience")]
    pub experience_years: u32,
    #[serde(alias = "consultationFee")]
    pub consultation_fee: f64,
    #[serde(default)]
    pub availability: Vec<AvailabilityWindow>,
    pub hospital: Option<Hospital>,
    pub about: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorProfileRequest {
    pub specialization: Option<String>,
    pub qualifications: Option<Vec<Qualification>>,
    #[serde(alias = "experience")]
    pub experience_years: Option<u32>,
    #[serde(alias = "consultationFee")]
    pub consultation_fee: Option<f64>,
    pub availability: Option<Vec<AvailabilityWindow>>,
    pub hospital: Option<Hospital>,
    pub about: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorSearchFilters {
    pub specialization: Option<String>,
    pub city: Option<String>,
    #[serde(alias = "minFee")]
    pub min_fee: Option<f64>,
    #[serde(alias = "maxFee")]
    pub max_fee: Option<f64>,
    #[serde(alias = "rating")]
    pub min_rating: Option<f32>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn validate_fee(fee: f64) -> Result<(), DoctorError> {
    if !fee.is_finite() || fee < 0.0 {
        return Err(DoctorError::Validation("Fee cannot be negative".to_string()));
    }
    Ok(())
}

fn validate_about(about: Option<&String>) -> Result<(), DoctorError> {
    if about.is_some_and(|text| text.chars().count() > MAX_ABOUT_LENGTH) {
        return Err(DoctorError::Validation(format!(
            "About section cannot exceed {} characters",
            MAX_ABOUT_LENGTH
        )));
    }
    Ok(())
}

impl DoctorSearchFilters {
    pub fn validate(&self) -> Result<(), DoctorError> {
        if let Some(min_fee) = self.min_fee {
            validate_fee(min_fee)?;
        }
        if let Some(max_fee) = self.max_fee {
            validate_fee(max_fee)?;
        }
        if let (Some(min_fee), Some(max_fee)) = (self.min_fee, self.max_fee) {
            if min_fee > max_fee {
                return Err(DoctorError::Validation("min_fee cannot exceed max_fee".to_string()));
            }
        }
        if self.min_rating.is_some_and(|rating| !(0.0..=5.0).contains(&rating)) {
            return Err(DoctorError::Validation("Rating must be between 0 and 5".to_string()));
        }
        Ok(())
    }
}

impl CreateDoctorProfileRequest {
    pub fn validate(&self) -> Result<(), DoctorError> {
        if self.specialization.trim().is_empty() {
            return Err(DoctorError::Validation("Please provide specialization".to_string()));
        }
        validate_fee(self.consultation_fee)?;
        validate_about(self.about.as_ref())?;
        self.availability.iter().try_for_each(AvailabilityWindow::validate)
    }
}

impl UpdateDoctorProfileRequest {
    pub fn validate(&self) -> Result<(), DoctorError> {
        if self.specialization.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(DoctorError::Validation("Specialization cannot be empty".to_string()));
        }
        if let Some(fee) = self.consultation_fee {
            validate_fee(fee)?;
        }
        validate_about(self.about.as_ref())?;
        if let Some(availability) = &self.availability {
            availability.iter().try_for_each(AvailabilityWindow::validate)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.specialization.is_none()
            && self.qualifications.is_none()
            && self.experience_years.is_none()
            && self.consultation_fee.is_none()
            && self.availability.is_none()
            && self.hospital.is_none()
            && self.about.is_none()
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Doctor profile not found")]
    ProfileNotFound,

    #[error("Doctor profile already exists")]
    ProfileExists,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DoctorError> for AppError {
    fn from(error: DoctorError) -> Self {
        match error {
            DoctorError::NotFound | DoctorError::ProfileNotFound => AppError::NotFound(error.to_string()),
            DoctorError::ProfileExists => AppError::BadRequest(error.to_string()),
            DoctorError::Validation(msg) => AppError::ValidationError(msg),
            DoctorError::Database(msg) => AppError::Database(msg),
        }
    }
}
