use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Actor, Role, User};
use shared_models::error::AppError;
use shared_models::pagination::PageRequest;

use crate::models::{CreateDoctorProfileRequest, DoctorSearchFilters, UpdateDoctorProfileRequest};
use crate::services::DoctorService;

fn doctor_actor(user: &User) -> Result<Actor, AppError> {
    let actor = Actor::from_user(user)?;
    actor.require_role(Role::Doctor)?;
    Ok(actor)
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn search_doctors(
    State(config): State<Arc<AppConfig>>,
    Query(filters): Query<DoctorSearchFilters>,
) -> Result<Json<Value>, AppError> {
    let page = PageRequest::new(filters.page, filters.limit)?;
    let service = DoctorService::new(&config);

    let (doctors, pagination) = service.search_doctors(filters, page).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "doctors": doctors,
            "pagination": pagination
        }
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(config): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&config);

    let doctor = service.get_doctor(doctor_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "doctor": doctor }
    })))
}

// ==============================================================================
// DOCTOR-ONLY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorProfileRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let actor = doctor_actor(&user)?;
    let service = DoctorService::new(&config);

    let doctor = service.create_profile(actor.id, request).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "message": "Doctor profile created successfully",
        "data": { "doctor": doctor }
    }))))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = doctor_actor(&user)?;
    let service = DoctorService::new(&config);

    let doctor = service.get_profile(actor.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "doctor": doctor }
    })))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = doctor_actor(&user)?;
    let service = DoctorService::new(&config);

    let doctor = service.update_profile(actor.id, request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Doctor profile updated successfully",
        "data": { "doctor": doctor }
    })))
}
