use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::{DatabaseError, SupabaseClient};
use shared_models::pagination::{PageRequest, Pagination};

use crate::models::{
    Doctor, DoctorError, DoctorSearchFilters,
    CreateDoctorProfileRequest, UpdateDoctorProfileRequest,
};
use crate::services::directory::DoctorDirectory;

pub struct DoctorService {
    supabase: SupabaseClient,
}

fn database_error(error: anyhow::Error) -> DoctorError {
    DoctorError::Database(error.to_string())
}

fn parse_doctor(row: Value) -> Result<Doctor, DoctorError> {
    serde_json::from_value(row)
        .map_err(|e| DoctorError::Database(format!("Failed to parse doctor: {}", e)))
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn find_one(&self, filter: &str) -> Result<Option<Doctor>, DoctorError> {
        let path = format!("/rest/v1/doctors?{}&limit=1", filter);
        let result: Vec<Value> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(database_error)?;

        result.into_iter().next().map(parse_doctor).transpose()
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor profile: {}", doctor_id);

        self.find_one(&format!("id=eq.{}", doctor_id))
            .await?
            .ok_or(DoctorError::NotFound)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor profile for user: {}", user_id);

        self.find_one(&format!("user_id=eq.{}", user_id))
            .await?
            .ok_or(DoctorError::ProfileNotFound)
    }

    /// One profile per user; the `doctors.user_id` unique index backs the pre-check.
    pub async fn create_profile(
        &self,
        user_id: Uuid,
        request: CreateDoctorProfileRequest,
    ) -> Result<Doctor, DoctorError> {
        request.validate()?;

        if self.find_one(&format!("user_id=eq.{}", user_id)).await?.is_some() {
            warn!("Doctor profile already exists for user {}", user_id);
            return Err(DoctorError::ProfileExists);
        }

        let now = Utc::now().to_rfc3339();
        let doctor_data = json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "specialization": request.specialization.trim(),
            "qualifications": request.qualifications,
            "experience_years": request.experience_years,
            "consultation_fee": request.consultation_fee,
            "availability": request.availability,
            "hospital": request.hospital,
            "about": request.about,
            "rating": 0.0,
            "total_reviews": 0,
            "is_verified": false,
            "created_at": now,
            "updated_at": now
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/doctors",
            Some(doctor_data),
            Some(headers),
        ).await.map_err(|e| {
            if DatabaseError::is_unique_violation(&e) {
                DoctorError::ProfileExists
            } else {
                database_error(e)
            }
        })?;

        let doctor = result
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::Database("Failed to create doctor profile".to_string()))
            .and_then(parse_doctor)?;

        info!("Doctor profile {} created for user {}", doctor.id, user_id);
        Ok(doctor)
    }

    /// Partial update of the caller's own profile. Fee changes apply to future
    /// bookings only; appointments keep the fee they were booked with.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateDoctorProfileRequest,
    ) -> Result<Doctor, DoctorError> {
        request.validate()?;

        if request.is_empty() {
            return self.get_profile(user_id).await;
        }

        let mut update_data = serde_json::Map::new();

        if let Some(specialization) = request.specialization {
            update_data.insert("specialization".to_string(), json!(specialization.trim()));
        }
        if let Some(qualifications) = request.qualifications {
            update_data.insert("qualifications".to_string(), json!(qualifications));
        }
        if let Some(experience) = request.experience_years {
            update_data.insert("experience_years".to_string(), json!(experience));
        }
        if let Some(fee) = request.consultation_fee {
            update_data.insert("consultation_fee".to_string(), json!(fee));
        }
        if let Some(availability) = request.availability {
            update_data.insert("availability".to_string(), json!(availability));
        }
        if let Some(hospital) = request.hospital {
            update_data.insert("hospital".to_string(), json!(hospital));
        }
        if let Some(about) = request.about {
            update_data.insert("about".to_string(), json!(about));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/doctors?user_id=eq.{}", user_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(database_error)?;

        let doctor = result
            .into_iter()
            .next()
            .ok_or(DoctorError::ProfileNotFound)
            .and_then(parse_doctor)?;

        info!("Doctor profile {} updated", doctor.id);
        Ok(doctor)
    }

    /// Filtered listing, newest profiles first.
    pub async fn search_doctors(
        &self,
        filters: DoctorSearchFilters,
        page: PageRequest,
    ) -> Result<(Vec<Doctor>, Pagination), DoctorError> {
        debug!("Searching doctors with filters: {:?}", filters);
        filters.validate()?;

        let path = format!("/rest/v1/doctors?{}", Self::search_query(&filters, page).join("&"));
        let (rows, total): (Vec<Value>, u64) = self.supabase
            .request_with_count(&path)
            .await
            .map_err(database_error)?;

        let doctors = rows
            .into_iter()
            .map(parse_doctor)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((doctors, Pagination::new(page, total)))
    }

    fn search_query(filters: &DoctorSearchFilters, page: PageRequest) -> Vec<String> {
        let mut query_parts = vec!["select=*".to_string()];

        if let Some(specialization) = filters.specialization.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("*{}*", specialization.trim());
            query_parts.push(format!("specialization=ilike.{}", urlencoding::encode(&pattern)));
        }
        if let Some(city) = filters.city.as_deref().filter(|c| !c.trim().is_empty()) {
            let pattern = format!("*{}*", city.trim());
            query_parts.push(format!("hospital->>city=ilike.{}", urlencoding::encode(&pattern)));
        }
        if let Some(min_fee) = filters.min_fee {
            query_parts.push(format!("consultation_fee=gte.{}", min_fee));
        }
        if let Some(max_fee) = filters.max_fee {
            query_parts.push(format!("consultation_fee=lte.{}", max_fee));
        }
        if let Some(min_rating) = filters.min_rating {
            query_parts.push(format!("rating=gte.{}", min_rating));
        }

        query_parts.push("order=created_at.desc".to_string());
        query_parts.push(format!("limit={}", page.limit));
        query_parts.push(format!("offset={}", page.offset()));

        query_parts
    }
}

#[async_trait]
impl DoctorDirectory for DoctorService {
    async fn get_by_id(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.get_doctor(doctor_id).await
    }

    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Doctor, DoctorError> {
        self.get_profile(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_includes_filters_and_paging() {
        let filters = DoctorSearchFilters {
            specialization: Some("cardio".to_string()),
            city: Some("Dublin".to_string()),
            min_fee: Some(50.0),
            max_fee: Some(200.0),
            min_rating: Some(4.0),
            ..Default::default()
        };
        let page = PageRequest::new(Some(2), Some(5)).unwrap();

        let query = DoctorService::search_query(&filters, page);

        assert!(query.contains(&"specialization=ilike.%2Acardio%2A".to_string()));
        assert!(query.contains(&"hospital->>city=ilike.%2ADublin%2A".to_string()));
        assert!(query.contains(&"consultation_fee=gte.50".to_string()));
        assert!(query.contains(&"consultation_fee=lte.200".to_string()));
        assert!(query.contains(&"rating=gte.4".to_string()));
        assert!(query.contains(&"limit=5".to_string()));
        assert!(query.contains(&"offset=5".to_string()));
    }

    #[test]
    fn test_search_query_skips_blank_filters() {
        let filters = DoctorSearchFilters {
            specialization: Some("  ".to_string()),
            ..Default::default()
        };
        let query = DoctorService::search_query(&filters, PageRequest::default());
        assert!(!query.iter().any(|part| part.starts_with("specialization")));
    }
}
