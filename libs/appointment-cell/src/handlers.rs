use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{Actor, User};
use shared_models::error::AppError;
use shared_models::pagination::PageRequest;

use crate::models::{
    BookAppointmentRequest, CancelAppointmentRequest, DoctorAppointmentsQuery, NoShowRequest,
    PatientAppointmentsQuery, RecordPaymentRequest, UpdateStatusRequest,
};
use crate::services::booking::AppointmentBookingService;

pub type BookingState = Arc<AppointmentBookingService>;

// Extractor rejections surface as the usual 400 envelope instead of axum's plain-text 4xx.

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    params
        .map(|Query(value)| value)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

fn appointment_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::BadRequest("Invalid appointment id".to_string()))
}

fn appointment_response(message: &str, appointment: impl serde::Serialize) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": message,
        "data": { "appointment": appointment }
    }))
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(booking): State<BookingState>,
    Extension(user): Extension<User>,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let actor = Actor::from_user(&user)?;
    let request = body(payload)?;

    let appointment = booking.create_appointment(&actor, request).await?;

    Ok((StatusCode::CREATED, appointment_response("Appointment booked successfully", appointment)))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(booking): State<BookingState>,
    Extension(user): Extension<User>,
    params: Result<Query<PatientAppointmentsQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let actor = Actor::from_user(&user)?;
    let params = query(params)?;
    let page = PageRequest::new(params.page, params.limit)?;

    let result = booking.list_for_patient(&actor, params.status, page).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "appointments": result.items,
            "pagination": result.pagination()
        }
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(booking): State<BookingState>,
    Extension(user): Extension<User>,
    params: Result<Query<DoctorAppointmentsQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let actor = Actor::from_user(&user)?;
    let params = query(params)?;
    let page = PageRequest::new(params.page, params.limit)?;

    let result = booking
        .list_for_doctor(&actor, params.status, params.date, page)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "appointments": result.items,
            "pagination": result.pagination()
        }
    })))
}

#[axum::debug_handler]
pub async fn get_appointment_stats(
    State(booking): State<BookingState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = Actor::from_user(&user)?;

    let stats = booking.get_stats(&actor).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "stats": stats }
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(booking): State<BookingState>,
    Extension(user): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let actor = Actor::from_user(&user)?;
    let appointment_id = appointment_id(path)?;

    let appointment = booking.get_appointment(&actor, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "appointment": appointment }
    })))
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(booking): State<BookingState>,
    Extension(user): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let actor = Actor::from_user(&user)?;
    let appointment_id = appointment_id(path)?;
    let request = body(payload)?;

    let appointment = booking.update_status(&actor, appointment_id, request).await?;

    Ok(appointment_response("Appointment updated successfully", appointment))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(booking): State<BookingState>,
    Extension(user): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CancelAppointmentRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let actor = Actor::from_user(&user)?;
    let appointment_id = appointment_id(path)?;
    let request = body(payload)?;

    let appointment = booking.cancel_appointment(&actor, appointment_id, request).await?;

    Ok(appointment_response("Appointment cancelled successfully", appointment))
}

#[axum::debug_handler]
pub async fn mark_no_show(
    State(booking): State<BookingState>,
    Extension(user): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<NoShowRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let actor = Actor::from_user(&user)?;
    let appointment_id = appointment_id(path)?;
    let request = body(payload)?;

    let appointment = booking.mark_no_show(&actor, appointment_id, request).await?;

    Ok(appointment_response("Appointment marked as no-show", appointment))
}

#[axum::debug_handler]
pub async fn record_payment(
    State(booking): State<BookingState>,
    Extension(user): Extension<User>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RecordPaymentRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let actor = Actor::from_user(&user)?;
    let appointment_id = appointment_id(path)?;
    let request = body(payload)?;

    let appointment = booking.record_payment(&actor, appointment_id, request).await?;

    Ok(appointment_response("Payment status updated successfully", appointment))
}
