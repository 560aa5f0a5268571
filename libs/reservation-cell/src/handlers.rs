use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use notification_cell::WhatsAppNotifier;
use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{CreateReservationRequest, ReservationListQuery, StatusUpdateRequest};
use crate::services::validation::hk_today;
use crate::services::ReservationService;

fn doctor_scope(user: &AuthUser) -> Result<i64, AppError> {
    user.doctor_id
        .ok_or_else(|| AppError::Forbidden("Doctor account required".to_string()))
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let notifier = WhatsAppNotifier::from_state(&state).await;
    let reservation = ReservationService::new(&state)
        .with_notifier(notifier)
        .create(request, hk_today())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "reservation": reservation,
            "message": "Reservation received, the clinic will contact you to confirm"
        })),
    ))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_reservations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReservationListQuery>,
) -> Result<Json<Value>, AppError> {
    let page = ReservationService::new(&state).list(&query).await?;
    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn update_reservation_status(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<i64>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let reservation = ReservationService::new(&state)
        .update_status(reservation_id, request.status, None)
        .await?;
    Ok(Json(json!(reservation)))
}

// ==============================================================================
// DOCTOR PORTAL HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_own_reservations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ReservationListQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = doctor_scope(&user)?;
    let page = ReservationService::new(&state).list_for_doctor(doctor_id, &query).await?;
    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn update_own_reservation_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(reservation_id): Path<i64>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = doctor_scope(&user)?;
    let reservation = ReservationService::new(&state)
        .update_status(reservation_id, request.status, Some(doctor_id))
        .await?;
    Ok(Json(json!(reservation)))
}
