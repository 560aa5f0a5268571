use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::{auth_middleware, require_admin};

use crate::handlers;

pub fn doctor_routes(state: Arc<AppState>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/doctors/search", get(handlers::search_doctors_public))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_public))
        .route("/doctors/{doctor_id}/affiliation-request", post(handlers::request_affiliation))
        .route("/locations", get(handlers::list_locations))
        .route("/specialties", get(handlers::list_specialties));

    // Directory management (admin session required)
    let admin_routes = Router::new()
        .route("/admin/doctors", get(handlers::list_doctors).post(handlers::create_doctor))
        .route("/admin/doctors/import", post(handlers::import_doctors))
        .route("/admin/doctors/export", get(handlers::export_doctors))
        .route(
            "/admin/doctors/{doctor_id}",
            get(handlers::get_doctor).put(handlers::update_doctor).delete(handlers::delete_doctor),
        )
        .route("/admin/doctors/{doctor_id}/affiliation", put(handlers::set_affiliation))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
