use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
};
use chrono::Utc;
use serde_json::Value;

use shared_config::{AiProviderKind, AppConfig};
use shared_database::AppState;
use shared_models::auth::{AdminRole, AuthUser};

use crate::jwt::issue_token;

pub struct TestConfig {
    pub session_secret: String,
    pub ai_base_url: String,
    pub pubmed_base_url: String,
    pub whatsapp_bridge_url: Option<String>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            session_secret: "test-secret-key-for-session-tokens-must-be-long-enough".to_string(),
            ai_base_url: "http://127.0.0.1:9".to_string(),
            pubmed_base_url: "http://127.0.0.1:9".to_string(),
            whatsapp_bridge_url: None,
        }
    }
}

impl TestConfig {
    /// Point the LLM and PubMed clients at a mock server.
    pub fn with_upstream(base_url: &str) -> Self {
        Self {
            ai_base_url: base_url.to_string(),
            pubmed_base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            doctors_db_path: "sqlite::memory:".to_string(),
            admin_db_path: "sqlite::memory:".to_string(),
            session_secret: self.session_secret.clone(),
            session_ttl_hours: 12,
            ai_provider: AiProviderKind::OpenRouter,
            openrouter_api_key: "test-openrouter-key".to_string(),
            openrouter_model: "test/model".to_string(),
            openrouter_base_url: self.ai_base_url.clone(),
            openai_api_key: "test-openai-key".to_string(),
            openai_model: "gpt-test".to_string(),
            openai_base_url: self.ai_base_url.clone(),
            ollama_base_url: self.ai_base_url.clone(),
            ollama_model: "llama-test".to_string(),
            pubmed_base_url: self.pubmed_base_url.clone(),
            pubmed_email: "test@example.com".to_string(),
            whatsapp_enabled: self.whatsapp_bridge_url.is_some(),
            whatsapp_bridge_url: self.whatsapp_bridge_url.clone().unwrap_or_default(),
            whatsapp_target_number: "85291234567".to_string(),
            analytics_retention_days: 365,
            maintenance_interval_secs: 3600,
        }
    }

    /// Application state over fresh in-memory databases.
    pub async fn to_state(&self) -> Arc<AppState> {
        let state = AppState::in_memory(self.to_app_config())
            .await
            .expect("in-memory databases should open");
        Arc::new(state)
    }
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub role: AdminRole,
    pub doctor_id: Option<i64>,
}

impl TestUser {
    pub fn new(id: i64, username: &str, role: AdminRole) -> Self {
        Self {
            id,
            username: username.to_string(),
            role,
            doctor_id: None,
        }
    }

    pub fn super_admin() -> Self {
        Self::new(1, "root", AdminRole::SuperAdmin)
    }

    pub fn admin() -> Self {
        Self::new(2, "staff", AdminRole::Admin)
    }

    /// Each linked doctor gets its own portal account.
    pub fn doctor(doctor_id: i64) -> Self {
        Self {
            doctor_id: Some(doctor_id),
            ..Self::new(100 + doctor_id, &format!("doctor{}", doctor_id), AdminRole::Doctor)
        }
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            doctor_id: self.doctor_id,
            issued_at: None,
        }
    }

    pub fn token(&self, secret: &str) -> String {
        issue_token(&self.to_auth_user(), secret, 1)
            .expect("test secret is set")
            .0
    }

    /// Store this account in `admin_users` (replacing any row with the same
    /// id) so the auth middleware accepts its tokens. It has no usable password.
    pub async fn register(&self, state: &AppState) {
        sqlx::query(
            "INSERT OR REPLACE INTO admin_users (id, username, password_hash, created_at, role, doctor_id) \
             VALUES (?, ?, '!', ?, ?, ?)",
        )
        .bind(self.id)
        .bind(&self.username)
        .bind(Utc::now())
        .bind(self.role.as_str())
        .bind(self.doctor_id)
        .execute(state.admin_db.pool())
        .await
        .expect("test account should insert");
    }

    /// `register` followed by `token`.
    pub async fn session_token(&self, state: &AppState) -> String {
        self.register(state).await;
        self.token(&state.config.session_secret)
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        issue_token(&user.to_auth_user(), secret, -1)
            .expect("test secret is set")
            .0
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        user.token("wrong-secret")
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request"),
        None => builder.body(Body::empty()).expect("valid request"),
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let text = body_string(response).await;
    serde_json::from_str(&text).expect("json body")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::validate_token;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert!(!app_config.session_secret.is_empty());
        assert!(!app_config.whatsapp_enabled);
        assert!(app_config.is_ai_configured(AiProviderKind::OpenAi));
    }

    #[test]
    fn test_user_tokens_validate() {
        let config = TestConfig::default();
        let user = TestUser::doctor(42);
        let token = user.token(&config.session_secret);

        let validated = validate_token(&token, &config.session_secret).unwrap();
        assert_eq!(validated.role, AdminRole::Doctor);
        assert_eq!(validated.doctor_id, Some(42));
        assert_ne!(validated.id, TestUser::doctor(7).id);
    }

    #[tokio::test]
    async fn registered_users_are_stored() {
        let state = TestConfig::default().to_state().await;
        TestUser::doctor(5).register(&state).await;
        TestUser::doctor(5).register(&state).await;

        let row: (String, String, Option<i64>) =
            sqlx::query_as("SELECT username, role, doctor_id FROM admin_users WHERE id = 105")
                .fetch_one(state.admin_db.pool())
                .await
                .unwrap();
        assert_eq!(row, ("doctor5".to_string(), "doctor".to_string(), Some(5)));
    }

    #[test]
    fn test_bad_tokens_fail() {
        let config = TestConfig::default();
        let user = TestUser::admin();
        assert!(validate_token(&JwtTestUtils::create_expired_token(&user, &config.session_secret), &config.session_secret).is_err());
        assert!(validate_token(&JwtTestUtils::create_invalid_signature_token(&user), &config.session_secret).is_err());
        assert!(validate_token(&JwtTestUtils::create_malformed_token(), &config.session_secret).is_err());
    }
}
