use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::error::AppError;
use shared_models::pagination::PageParams;

use crate::models::{QueryReport, SevereCaseQuery, SymptomRequest};
use crate::services::{DoctorFinder, QueryService};

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn find_doctor(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SymptomRequest>,
) -> Result<Json<Value>, AppError> {
    let response = DoctorFinder::new(&state).find(request).await?;
    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(query_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let query = QueryService::new(&state).get(query_id).await?;
    Ok(Json(json!(QueryReport::from(query))))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_queries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, AppError> {
    let page = QueryService::new(&state).list(&params).await?;
    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn export_queries(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let csv = QueryService::new(&state).export_csv().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"user_queries.csv\""),
        ],
        csv,
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn list_severe_cases(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SevereCaseQuery>,
) -> Result<Json<Value>, AppError> {
    let cases = QueryService::new(&state).list_severe_cases(query.handled).await?;
    Ok(Json(json!({
        "severe_cases": cases,
        "total": cases.len()
    })))
}

#[axum::debug_handler]
pub async fn mark_severe_case_handled(
    State(state): State<Arc<AppState>>,
    Path(case_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    QueryService::new(&state).mark_handled(case_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
