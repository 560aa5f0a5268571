use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{CreateUserRequest, LoginOutcome, LoginRequest, ResetPasswordRequest, TotpCodeRequest};
use crate::services::{AdminAccountService, ConfigService};

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    match AdminAccountService::new(&state).login(request).await? {
        LoginOutcome::TotpRequired => Ok(Json(json!({ "requires_totp": true }))),
        LoginOutcome::Authenticated(token) => Ok(Json(json!(token))),
    }
}

// ==============================================================================
// SESSION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let account = AdminAccountService::new(&state).get(user.id).await?;
    Ok(Json(json!(account)))
}

#[axum::debug_handler]
pub async fn setup_totp(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, AppError> {
    let setup = AdminAccountService::new(&state).setup_totp(user.id).await?;
    Ok(Json(json!(setup)))
}

#[axum::debug_handler]
pub async fn enable_totp(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<TotpCodeRequest>,
) -> Result<Json<Value>, AppError> {
    AdminAccountService::new(&state).enable_totp(user.id, &request.code).await?;
    Ok(Json(json!({ "totp_enabled": true })))
}

#[axum::debug_handler]
pub async fn disable_totp(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<TotpCodeRequest>,
) -> Result<Json<Value>, AppError> {
    AdminAccountService::new(&state).disable_totp(user.id, &request.code).await?;
    Ok(Json(json!({ "totp_enabled": false })))
}

// ==============================================================================
// SUPER ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let users = AdminAccountService::new(&state).list().await?;
    Ok(Json(json!({
        "users": users,
        "total": users.len()
    })))
}

#[axum::debug_handler]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user = AdminAccountService::new(&state).create(request).await?;
    Ok((StatusCode::CREATED, Json(json!(user))))
}

#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    AdminAccountService::new(&state).delete(user_id, actor.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    AdminAccountService::new(&state)
        .reset_password(user_id, &request.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_config(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let view = ConfigService::new(&state).view().await?;
    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(changes): Json<BTreeMap<String, Value>>,
) -> Result<Json<Value>, AppError> {
    let view = ConfigService::new(&state).update(changes).await?;
    Ok(Json(json!(view)))
}
