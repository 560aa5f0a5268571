// =====================================================================================
// MONITORING CELL HANDLERS
// =====================================================================================

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::instrument;

use shared_database::AppState;
use shared_models::error::AppError;

use crate::models::{event_types, ClickRequest, HealthReport, HealthStatus, SummaryQuery};
use crate::services::{AnalyticsService, HealthMonitorService};

// =====================================================================================
// PUBLIC ENDPOINTS
// =====================================================================================

#[instrument(skip(state))]
pub async fn get_health_status(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthReport>) {
    let report = HealthMonitorService::new(&state).check().await;
    let status = match report.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report))
}

#[axum::debug_handler]
pub async fn track_click(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClickRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if request.doctor_id <= 0 {
        return Err(AppError::ValidationError("doctor_id must be positive".to_string()));
    }

    let data = json!({
        "doctor_id": request.doctor_id,
        "query_id": request.query_id,
        "source": request.source,
    });
    let id = AnalyticsService::new(&state).record(event_types::DOCTOR_CLICK, &data).await?;

    Ok((StatusCode::CREATED, Json(json!({ "event_id": id }))))
}

// =====================================================================================
// ADMIN ENDPOINTS
// =====================================================================================

#[axum::debug_handler]
pub async fn get_dashboard_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Value>, AppError> {
    let summary = AnalyticsService::new(&state).summary(query.days()).await?;
    Ok(Json(json!(summary)))
}
