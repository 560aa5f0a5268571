use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info, instrument, warn};

use doctor_cell::services::DoctorService;
use monitoring_cell::models::event_types;
use monitoring_cell::services::AnalyticsService;
use shared_database::AppState;
use shared_models::auth::{AdminRole, TokenResponse};
use shared_utils::jwt::issue_token;

use crate::models::{AdminError, AdminUser, AdminUserRow, CreateUserRequest, LoginOutcome, LoginRequest, TotpSetup};
use crate::services::password::PasswordService;
use crate::services::totp;

const USER_COLUMNS: &str =
    "id, username, password_hash, role, doctor_id, totp_secret, totp_enabled, last_login_at, created_at";

/// Admin panel and doctor portal accounts.
pub struct AdminAccountService {
    db: SqlitePool,
    doctors: DoctorService,
    analytics: AnalyticsService,
    session_secret: String,
    session_ttl_hours: i64,
}

impl AdminAccountService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.admin_db.pool().clone(),
            doctors: DoctorService::new(state),
            analytics: AnalyticsService::new(state),
            session_secret: state.config.session_secret.clone(),
            session_ttl_hours: state.config.session_ttl_hours,
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AdminUserRow>, AdminError> {
        let row = sqlx::query_as::<_, AdminUserRow>(&format!(
            "SELECT {} FROM admin_users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_row(&self, user_id: i64) -> Result<AdminUserRow, AdminError> {
        sqlx::query_as::<_, AdminUserRow>(&format!("SELECT {} FROM admin_users WHERE id = ?", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AdminError::NotFound(user_id))
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome, AdminError> {
        let username = request.username.trim();

        let Some(row) = self.find_by_username(username).await? else {
            warn!("Login attempt for unknown user");
            return Err(AdminError::InvalidCredentials);
        };

        if !PasswordService::verify_password(&request.password, &row.password_hash) {
            warn!("Login attempt with wrong password");
            return Err(AdminError::InvalidCredentials);
        }

        if row.totp_enabled {
            let secret = row.totp_secret.as_deref().unwrap_or_default();
            match request.totp_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
                None => {
                    debug!("Password accepted, verification code required");
                    return Ok(LoginOutcome::TotpRequired);
                }
                Some(code) if !totp::verify(secret, code, Utc::now()) => {
                    warn!("Login attempt with wrong verification code");
                    return Err(AdminError::InvalidTotpCode);
                }
                Some(_) => {}
            }
        }

        let user = row.to_auth_user()?;
        let (token, expires_at) =
            issue_token(&user, &self.session_secret, self.session_ttl_hours).map_err(AdminError::Session)?;

        sqlx::query("UPDATE admin_users SET last_login_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(user.id)
            .execute(&self.db)
            .await?;

        self.analytics.record_detached(
            event_types::ADMIN_LOGIN,
            json!({ "user_id": user.id, "username": user.username, "role": user.role }),
        );

        info!("User {} logged in as {}", user.username, user.role);
        Ok(LoginOutcome::Authenticated(TokenResponse {
            token,
            expires_at,
            user,
        }))
    }

    pub async fn get(&self, user_id: i64) -> Result<AdminUser, AdminError> {
        self.find_row(user_id).await?.try_into()
    }

    pub async fn list(&self) -> Result<Vec<AdminUser>, AdminError> {
        let rows = sqlx::query_as::<_, AdminUserRow>(&format!("SELECT {} FROM admin_users ORDER BY id", USER_COLUMNS))
            .fetch_all(&self.db)
            .await?;
        rows.into_iter().map(AdminUser::try_from).collect()
    }

    pub async fn count(&self) -> Result<i64, AdminError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM admin_users")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    #[instrument(skip(self, request), fields(username = %request.username, role = %request.role))]
    pub async fn create(&self, request: CreateUserRequest) -> Result<AdminUser, AdminError> {
        let username = request.username.trim().to_string();
        if username.is_empty() {
            return Err(AdminError::Validation("username is required".to_string()));
        }
        PasswordService::validate_strength(&request.password)?;

        let doctor_id = match request.role {
            AdminRole::Doctor => {
                let doctor_id = request
                    .doctor_id
                    .ok_or_else(|| AdminError::Validation("doctor accounts need a doctor_id".to_string()))?;
                self.doctors.get_doctor(doctor_id).await?;
                Some(doctor_id)
            }
            _ => None,
        };

        if self.find_by_username(&username).await?.is_some() {
            return Err(AdminError::UsernameTaken(username));
        }

        let password_hash = PasswordService::hash_password(&request.password)?;
        let result = sqlx::query(
            "INSERT INTO admin_users (username, password_hash, role, doctor_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&username)
        .bind(password_hash)
        .bind(request.role.as_str())
        .bind(doctor_id)
        .bind(Utc::now())
        .execute(&self.db)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                AdminError::UsernameTaken(username.clone())
            } else {
                AdminError::Database(e)
            }
        })?;

        info!("Created {} account {}", request.role, username);
        self.get(result.last_insert_rowid()).await
    }

    pub async fn delete(&self, user_id: i64, actor_id: i64) -> Result<(), AdminError> {
        if user_id == actor_id {
            return Err(AdminError::Validation("You cannot delete your own account".to_string()));
        }

        let result = sqlx::query("DELETE FROM admin_users WHERE id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AdminError::NotFound(user_id));
        }

        info!("Admin user {} deleted by {}", user_id, actor_id);
        Ok(())
    }

    pub async fn reset_password(&self, user_id: i64, password: &str) -> Result<(), AdminError> {
        PasswordService::validate_strength(password)?;
        let password_hash = PasswordService::hash_password(password)?;

        let result = sqlx::query("UPDATE admin_users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AdminError::NotFound(user_id));
        }

        info!("Password reset for admin user {}", user_id);
        Ok(())
    }

    /// Store a fresh secret. Verification stays off until `enable_totp`.
    pub async fn setup_totp(&self, user_id: i64) -> Result<TotpSetup, AdminError> {
        let row = self.find_row(user_id).await?;
        if row.totp_enabled {
            return Err(AdminError::Validation("Two-factor authentication is already enabled".to_string()));
        }

        let secret = totp::generate_secret();
        sqlx::query("UPDATE admin_users SET totp_secret = ?, totp_enabled = 0 WHERE id = ?")
            .bind(&secret)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        debug!("Generated TOTP secret for user {}", user_id);
        Ok(TotpSetup {
            otpauth_uri: totp::provisioning_uri(&secret, &row.username),
            secret,
        })
    }

    pub async fn enable_totp(&self, user_id: i64, code: &str) -> Result<(), AdminError> {
        let row = self.find_row(user_id).await?;
        let secret = row
            .totp_secret
            .ok_or_else(|| AdminError::Validation("Run two-factor setup first".to_string()))?;

        if !totp::verify(&secret, code, Utc::now()) {
            return Err(AdminError::InvalidTotpCode);
        }

        sqlx::query("UPDATE admin_users SET totp_enabled = 1 WHERE id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        info!("Two-factor authentication enabled for user {}", user_id);
        Ok(())
    }

    pub async fn disable_totp(&self, user_id: i64, code: &str) -> Result<(), AdminError> {
        let row = self.find_row(user_id).await?;
        if !row.totp_enabled {
            return Err(AdminError::Validation("Two-factor authentication is not enabled".to_string()));
        }

        let secret = row.totp_secret.unwrap_or_default();
        if !totp::verify(&secret, code, Utc::now()) {
            return Err(AdminError::InvalidTotpCode);
        }

        sqlx::query("UPDATE admin_users SET totp_secret = NULL, totp_enabled = 0 WHERE id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        info!("Two-factor authentication disabled for user {}", user_id);
        Ok(())
    }
}
