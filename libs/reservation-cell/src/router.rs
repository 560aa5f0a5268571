use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::{auth_middleware, require_admin, require_doctor};

use crate::handlers;

pub fn reservation_routes(state: Arc<AppState>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new().route("/reservations", post(handlers::create_reservation));

    let admin_routes = Router::new()
        .route("/admin/reservations", get(handlers::list_reservations))
        .route("/admin/reservations/{reservation_id}/status", patch(handlers::update_reservation_status))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let doctor_routes = Router::new()
        .route("/doctor-portal/reservations", get(handlers::list_own_reservations))
        .route(
            "/doctor-portal/reservations/{reservation_id}/status",
            patch(handlers::update_own_reservation_status),
        )
        .layer(middleware::from_fn(require_doctor))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(doctor_routes)
        .with_state(state)
}
