use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::info;

use shared_config::{AiProviderKind, AppConfig};
use shared_database::{settings, AppState};

use crate::models::AdminError;

/// Runtime settings as the admin panel sees them.
#[derive(Debug, Serialize)]
pub struct ConfigView {
    /// What the service currently uses, override or environment.
    pub effective: BTreeMap<&'static str, String>,
    pub overrides: BTreeMap<String, String>,
    pub editable_keys: &'static [&'static str],
}

pub struct ConfigService {
    db: SqlitePool,
    config: Arc<AppConfig>,
}

impl ConfigService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.admin_db.pool().clone(),
            config: state.config.clone(),
        }
    }

    fn default_model(&self, provider: AiProviderKind) -> String {
        match provider {
            AiProviderKind::OpenRouter => self.config.openrouter_model.clone(),
            AiProviderKind::OpenAi => self.config.openai_model.clone(),
            AiProviderKind::Ollama => self.config.ollama_model.clone(),
        }
    }

    pub async fn view(&self) -> Result<ConfigView, AdminError> {
        let overrides = settings::all(&self.db).await?;

        let provider = overrides
            .get(settings::AI_PROVIDER)
            .and_then(|raw| raw.parse::<AiProviderKind>().ok())
            .unwrap_or(self.config.ai_provider);

        let mut effective = BTreeMap::new();
        effective.insert(settings::AI_PROVIDER, provider.as_str().to_string());
        effective.insert(
            settings::AI_MODEL,
            overrides
                .get(settings::AI_MODEL)
                .cloned()
                .unwrap_or_else(|| self.default_model(provider)),
        );
        effective.insert(
            settings::WHATSAPP_ENABLED,
            overrides
                .get(settings::WHATSAPP_ENABLED)
                .map(|v| settings::parse_bool(v))
                .unwrap_or(self.config.whatsapp_enabled)
                .to_string(),
        );
        effective.insert(
            settings::WHATSAPP_TARGET,
            overrides
                .get(settings::WHATSAPP_TARGET)
                .cloned()
                .unwrap_or_else(|| self.config.whatsapp_target_number.clone()),
        );

        Ok(ConfigView {
            effective,
            overrides,
            editable_keys: settings::EDITABLE_KEYS,
        })
    }

    /// Apply `changes` atomically: every key is validated before anything is
    /// written. `null` or an empty string drops the override.
    pub async fn update(&self, changes: BTreeMap<String, Value>) -> Result<ConfigView, AdminError> {
        let mut normalized: Vec<(String, Option<String>)> = Vec::with_capacity(changes.len());

        for (key, value) in changes {
            if !settings::EDITABLE_KEYS.contains(&key.as_str()) {
                return Err(AdminError::Validation(format!("{} is not an editable setting", key)));
            }

            let value = match value {
                Value::Null => None,
                Value::Bool(b) => Some(b.to_string()),
                Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
                other => {
                    return Err(AdminError::Validation(format!("{} must be a string, got {}", key, other)));
                }
            };

            if let Some(value) = &value {
                validate_setting(&key, value)?;
            }
            normalized.push((key, value));
        }

        for (key, value) in normalized {
            match value {
                Some(value) => {
                    settings::set(&self.db, &key, &value).await?;
                    info!("Setting {} overridden", key);
                }
                None => {
                    if settings::remove(&self.db, &key).await? {
                        info!("Setting {} reset to environment", key);
                    }
                }
            }
        }

        self.view().await
    }
}

fn validate_setting(key: &str, value: &str) -> Result<(), AdminError> {
    match key {
        settings::AI_PROVIDER => value.parse::<AiProviderKind>().map(|_| ()).map_err(AdminError::Validation),
        settings::WHATSAPP_ENABLED => {
            let known = ["1", "0", "true", "false", "yes", "no", "on", "off"];
            if known.contains(&value.to_lowercase().as_str()) {
                Ok(())
            } else {
                Err(AdminError::Validation(format!("{} must be a boolean", key)))
            }
        }
        settings::WHATSAPP_TARGET => {
            if value.chars().all(|c| c.is_ascii_digit() || c == '+') {
                Ok(())
            } else {
                Err(AdminError::Validation(format!("{} must be a phone number", key)))
            }
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_known_settings() {
        assert!(validate_setting(settings::AI_PROVIDER, "ollama").is_ok());
        assert!(validate_setting(settings::AI_PROVIDER, "gemini").is_err());
        assert!(validate_setting(settings::WHATSAPP_ENABLED, "TRUE").is_ok());
        assert!(validate_setting(settings::WHATSAPP_ENABLED, "maybe").is_err());
        assert!(validate_setting(settings::WHATSAPP_TARGET, "85291234567").is_ok());
        assert!(validate_setting(settings::WHATSAPP_TARGET, "call me").is_err());
        assert!(validate_setting(settings::AI_MODEL, "anything/goes").is_ok());
    }
}
