use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::{auth_middleware, require_admin};

use crate::handlers;

pub fn symptom_routes(state: Arc<AppState>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/find_doctor", post(handlers::find_doctor))
        .route("/report/{query_id}", get(handlers::get_report));

    let admin_routes = Router::new()
        .route("/admin/queries", get(handlers::list_queries))
        .route("/admin/queries/export", get(handlers::export_queries))
        .route("/admin/severe-cases", get(handlers::list_severe_cases))
        .route("/admin/severe-cases/{case_id}/handled", post(handlers::mark_severe_case_handled))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
