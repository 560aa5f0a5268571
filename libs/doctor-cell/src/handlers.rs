use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{
    AdminDoctorView, AffiliationApplication, AffiliationUpdateRequest, CreateDoctorRequest, DoctorSearchQuery,
    ImportMode, UpdateDoctorRequest,
};
use crate::services::{
    affiliation::AffiliationService,
    csv_io::DoctorCsvService,
    doctor::DoctorService,
    locations,
    specialties::SPECIALTIES,
};

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    #[serde(default)]
    pub mode: ImportMode,
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn search_doctors_public(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);
    let page = doctor_service.search_doctors(&query).await?;
    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn get_doctor_public(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(&state).get_doctor(doctor_id).await?;
    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn request_affiliation(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i64>,
    Json(request): Json<AffiliationApplication>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doctor = AffiliationService::new(&state)
        .apply(doctor_id, request.whatsapp_number)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "doctor_id": doctor.id,
            "affiliation_status": doctor.affiliation_status,
            "message": "Affiliation request received"
        })),
    ))
}

pub async fn list_locations() -> Json<Value> {
    Json(json!({ "regions": locations::regions() }))
}

pub async fn list_specialties() -> Json<Value> {
    Json(json!({ "specialties": SPECIALTIES }))
}

// ==============================================================================
// ADMIN DIRECTORY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let page = DoctorService::new(&state).search_doctors(&query).await?;
    Ok(Json(json!(page.map(AdminDoctorView::from))))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(&state).get_doctor(doctor_id).await?;
    Ok(Json(json!(AdminDoctorView::from(doctor))))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doctor = DoctorService::new(&state).create_doctor(request).await?;
    info!("Admin {} created doctor {}", user.username, doctor.id);
    Ok((StatusCode::CREATED, Json(json!(AdminDoctorView::from(doctor)))))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i64>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(&state).update_doctor(doctor_id, request).await?;
    Ok(Json(json!(AdminDoctorView::from(doctor))))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(doctor_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    DoctorService::new(&state).delete_doctor(doctor_id).await?;
    info!("Admin {} deleted doctor {}", user.username, doctor_id);
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn set_affiliation(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i64>,
    Json(request): Json<AffiliationUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = AffiliationService::new(&state)
        .set_status(doctor_id, request.status, request.whatsapp_number)
        .await?;
    Ok(Json(json!(AdminDoctorView::from(doctor))))
}

#[axum::debug_handler]
pub async fn import_doctors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Result<Json<Value>, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("CSV body is empty".to_string()));
    }

    let report = DoctorCsvService::new(&state).import(&body, query.mode).await?;
    Ok(Json(json!(report)))
}

#[axum::debug_handler]
pub async fn export_doctors(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let csv = DoctorCsvService::new(&state).export().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"doctors.csv\""),
        ],
        csv,
    )
        .into_response())
}
