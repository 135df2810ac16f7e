use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::booking::AppointmentBookingService;

pub fn appointment_routes(config: Arc<AppConfig>) -> Router {
    let booking = Arc::new(AppointmentBookingService::new(&config));
    appointment_routes_with(config, booking)
}

/// Same routes over an injected workflow, so stores can be swapped in tests.
pub fn appointment_routes_with(config: Arc<AppConfig>, booking: Arc<AppointmentBookingService>) -> Router {
    // Every appointment operation requires authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::create_appointment))
        .route("/patient/my-appointments", get(handlers::get_patient_appointments))
        .route("/doctor/my-appointments", get(handlers::get_doctor_appointments))
        .route("/stats", get(handlers::get_appointment_stats))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", put(handlers::update_appointment_status))
        .route("/{appointment_id}/cancel", put(handlers::cancel_appointment))
        .route("/{appointment_id}/no-show", put(handlers::mark_no_show))
        .route("/{appointment_id}/payment", put(handlers::record_payment))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(booking)
}
