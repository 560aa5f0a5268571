use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};
use tracing::warn;

use shared_database::AppState;
use shared_models::auth::{AdminRole, AuthUser};
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Validates the bearer session token and attaches the `AuthUser`
/// to the request extensions. The account must still exist; its stored
/// role and doctor link win over what the token claims.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let claimed = validate_token(bearer.token(), &state.config.session_secret)
        .map_err(AppError::Auth)?;

    let user = current_account(&state, claimed).await?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

async fn current_account(state: &AppState, claimed: AuthUser) -> Result<AuthUser, AppError> {
    let row: Option<(String, String, Option<i64>)> =
        sqlx::query_as("SELECT username, role, doctor_id FROM admin_users WHERE id = ?")
            .bind(claimed.id)
            .fetch_optional(state.admin_db.pool())
            .await?;

    let Some((username, role, doctor_id)) = row else {
        warn!("Rejected session for deleted account {}", claimed.id);
        return Err(AppError::Auth("Account no longer exists".to_string()));
    };

    let role = role.parse::<AdminRole>().map_err(AppError::Auth)?;

    Ok(AuthUser {
        username,
        role,
        doctor_id,
        ..claimed
    })
}

pub fn extract_user<B>(request: &Request<B>) -> Result<AuthUser, AppError> {
    request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))
}

/// Must be layered inside `auth_middleware`.
pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = extract_user(&request)?;
    if !user.role.is_admin() {
        return Err(AppError::Forbidden("Administrator access required".to_string()));
    }
    Ok(next.run(request).await)
}

pub async fn require_super_admin(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = extract_user(&request)?;
    if user.role != AdminRole::SuperAdmin {
        return Err(AppError::Forbidden("Super administrator access required".to_string()));
    }
    Ok(next.run(request).await)
}

pub async fn require_doctor(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = extract_user(&request)?;
    if user.role != AdminRole::Doctor || user.doctor_id.is_none() {
        return Err(AppError::Forbidden("Doctor account required".to_string()));
    }
    Ok(next.run(request).await)
}
