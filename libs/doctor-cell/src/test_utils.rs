use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{AvailabilityWindow, Doctor, DoctorError, Weekday};
use crate::services::directory::DoctorDirectory;

/// Directory backed by a map, for exercising the booking workflow without Supabase.
#[derive(Default)]
pub struct InMemoryDoctorDirectory {
    doctors: RwLock<HashMap<Uuid, Doctor>>,
}

impl InMemoryDoctorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_doctor(user_id: Uuid, consultation_fee: f64) -> Doctor {
        let now = Utc::now();
        Doctor {
            id: Uuid::new_v4(),
            user_id,
            specialization: "General Practice".to_string(),
            qualifications: vec![],
            experience_years: 5,
            consultation_fee,
            availability: vec![AvailabilityWindow {
                day: Weekday::Monday,
                start_time: "09:00".to_string(),
                end_time: "17:00".to_string(),
                is_available: true,
            }],
            hospital: None,
            about: None,
            rating: 0.0,
            total_reviews: 0,
            is_verified: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn add_doctor(&self, user_id: Uuid, consultation_fee: f64) -> Doctor {
        let doctor = Self::sample_doctor(user_id, consultation_fee);
        self.doctors.write().await.insert(doctor.id, doctor.clone());
        doctor
    }

    pub async fn set_fee(&self, doctor_id: Uuid, consultation_fee: f64) -> Result<Doctor, DoctorError> {
        let mut doctors = self.doctors.write().await;
        let doctor = doctors.get_mut(&doctor_id).ok_or(DoctorError::NotFound)?;
        doctor.consultation_fee = consultation_fee;
        doctor.updated_at = Utc::now();
        Ok(doctor.clone())
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDoctorDirectory {
    async fn get_by_id(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.doctors
            .read()
            .await
            .get(&doctor_id)
            .cloned()
            .ok_or(DoctorError::NotFound)
    }

    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Doctor, DoctorError> {
        self.doctors
            .read()
            .await
            .values()
            .find(|doctor| doctor.user_id == user_id)
            .cloned()
            .ok_or(DoctorError::ProfileNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id_and_user() {
        tokio_test::block_on(async {
            let directory = InMemoryDoctorDirectory::new();
            let user_id = Uuid::new_v4();
            let doctor = directory.add_doctor(user_id, 100.0).await;

            assert_eq!(directory.get_by_id(doctor.id).await.unwrap().user_id, user_id);
            assert_eq!(directory.get_by_user_id(user_id).await.unwrap().id, doctor.id);
            assert!(matches!(
                directory.get_by_user_id(Uuid::new_v4()).await,
                Err(DoctorError::ProfileNotFound)
            ));
        });
    }

    #[test]
    fn test_set_fee() {
        tokio_test::block_on(async {
            let directory = InMemoryDoctorDirectory::new();
            let doctor = directory.add_doctor(Uuid::new_v4(), 100.0).await;

            directory.set_fee(doctor.id, 150.0).await.unwrap();
            assert_eq!(directory.get_by_id(doctor.id).await.unwrap().consultation_fee, 150.0);
            assert!(directory.set_fee(Uuid::new_v4(), 1.0).await.is_err());
        });
    }
}
