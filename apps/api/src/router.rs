use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use admin_cell::admin_routes;
use doctor_cell::router::doctor_routes;
use monitoring_cell::monitoring_routes;
use reservation_cell::reservation_routes;
use shared_database::AppState;
use symptom_cell::symptom_routes;

async fn index() -> Json<Value> {
    Json(json!({
        "service": "HK Doctor Match API",
        "status": "running"
    }))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .merge(symptom_routes(state.clone()))
        .merge(doctor_routes(state.clone()))
        .merge(reservation_routes(state.clone()))
        .merge(admin_routes(state.clone()))
        .merge(monitoring_routes(state))
}
