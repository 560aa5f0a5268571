use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

use doctor_cell::models::DoctorError;
use shared_models::auth::{AdminRole, AuthUser, TokenResponse};
use shared_models::error::AppError;

/// A row of `admin_data.db.admin_users`.
#[derive(Debug, Clone, FromRow)]
pub struct AdminUserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub doctor_id: Option<i64>,
    pub totp_secret: Option<String>,
    pub totp_enabled: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AdminUserRow {
    pub fn role(&self) -> Result<AdminRole, AdminError> {
        AdminRole::from_str(&self.role).map_err(AdminError::Corrupt)
    }

    pub fn to_auth_user(&self) -> Result<AuthUser, AdminError> {
        Ok(AuthUser {
            id: self.id,
            username: self.username.clone(),
            role: self.role()?,
            doctor_id: self.doctor_id,
            issued_at: None,
        })
    }
}

/// Account as shown in the admin panel; never carries secrets.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub role: AdminRole,
    pub doctor_id: Option<i64>,
    pub totp_enabled: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = AdminError;

    fn try_from(row: AdminUserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            role: row.role()?,
            id: row.id,
            username: row.username,
            doctor_id: row.doctor_id,
            totp_enabled: row.totp_enabled,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub totp_code: Option<String>,
}

#[derive(Debug)]
pub enum LoginOutcome {
    /// Password accepted but the account needs a verification code.
    TotpRequired,
    Authenticated(TokenResponse),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: AdminRole,
    pub doctor_id: Option<i64>,
}

fn default_role() -> AdminRole {
    AdminRole::Admin
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TotpCodeRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotpSetup {
    pub secret: String,
    pub otpauth_uri: String,
}

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid verification code")]
    InvalidTotpCode,

    #[error("Admin user {0} not found")]
    NotFound(i64),

    #[error("Username {0} is already taken")]
    UsernameTaken(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Stored account is invalid: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<argon2::password_hash::Error> for AdminError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AdminError::Hashing(err.to_string())
    }
}

impl From<AdminError> for AppError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::InvalidCredentials | AdminError::InvalidTotpCode => AppError::Auth(err.to_string()),
            AdminError::NotFound(_) => AppError::NotFound(err.to_string()),
            AdminError::UsernameTaken(_) => AppError::Conflict(err.to_string()),
            AdminError::Validation(msg) => AppError::ValidationError(msg),
            AdminError::Hashing(_) | AdminError::Session(_) | AdminError::Corrupt(_) => {
                AppError::Internal(err.to_string())
            }
            AdminError::Doctor(e) => e.into(),
            AdminError::Database(e) => AppError::from(e),
        }
    }
}
