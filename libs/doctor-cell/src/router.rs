use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::search_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor));

    // Doctor's own profile
    let protected_routes = Router::new()
        .route(
            "/profile",
            get(handlers::get_profile)
                .post(handlers::create_profile)
                .put(handlers::update_profile),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
