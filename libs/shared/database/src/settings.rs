//! Key/value overrides stored in `admin_data.db.app_config`.
//!
//! Values set here take precedence over the environment for the few
//! settings the admin panel can change at runtime.

use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::SqlitePool;

pub const AI_PROVIDER: &str = "ai_provider";
pub const AI_MODEL: &str = "ai_model";
pub const WHATSAPP_ENABLED: &str = "whatsapp_enabled";
pub const WHATSAPP_TARGET: &str = "whatsapp_target";

/// Keys the admin panel may write.
pub const EDITABLE_KEYS: &[&str] = &[AI_PROVIDER, AI_MODEL, WHATSAPP_ENABLED, WHATSAPP_TARGET];

pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT value FROM app_config WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
}

pub async fn set(pool: &SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO app_config (key, value, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn remove(pool: &SqlitePool, key: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM app_config WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn all(pool: &SqlitePool) -> Result<BTreeMap<String, String>, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM app_config ORDER BY key")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().collect())
}

pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
