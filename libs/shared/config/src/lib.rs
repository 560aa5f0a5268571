use std::env;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// LLM backend used for symptom analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderKind {
    OpenRouter,
    OpenAi,
    Ollama,
}

impl AiProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiProviderKind::OpenRouter => "openrouter",
            AiProviderKind::OpenAi => "openai",
            AiProviderKind::Ollama => "ollama",
        }
    }
}

impl FromStr for AiProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openrouter" => Ok(AiProviderKind::OpenRouter),
            "openai" => Ok(AiProviderKind::OpenAi),
            "ollama" => Ok(AiProviderKind::Ollama),
            other => Err(format!("Unknown AI provider: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub doctors_db_path: String,
    pub admin_db_path: String,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub ai_provider: AiProviderKind,
    pub openrouter_api_key: String,
    pub openrouter_model: String,
    pub openrouter_base_url: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub pubmed_base_url: String,
    pub pubmed_email: String,
    pub whatsapp_enabled: bool,
    pub whatsapp_bridge_url: String,
    pub whatsapp_target_number: String,
    pub analytics_retention_days: i64,
    pub maintenance_interval_secs: u64,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using default", name);
        default.to_string()
    })
}

fn var_or_empty(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        warn!("{} not set, using empty value", name);
        String::new()
    })
}

fn parsed_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let ai_provider = env::var("AI_PROVIDER")
            .ok()
            .and_then(|raw| match raw.parse::<AiProviderKind>() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    warn!("{}, falling back to openrouter", e);
                    None
                }
            })
            .unwrap_or(AiProviderKind::OpenRouter);

        let whatsapp_enabled = env::var("WHATSAPP_ENABLED")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        let config = Self {
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:5000"),
            doctors_db_path: var_or("DOCTORS_DB_PATH", "sqlite://doctors.db"),
            admin_db_path: var_or("ADMIN_DB_PATH", "sqlite://admin_data.db"),
            session_secret: var_or_empty("SESSION_SECRET"),
            session_ttl_hours: parsed_or("SESSION_TTL_HOURS", 12),
            ai_provider,
            openrouter_api_key: var_or_empty("OPENROUTER_API_KEY"),
            openrouter_model: var_or("OPENROUTER_MODEL", "deepseek/deepseek-chat"),
            openrouter_base_url: var_or("OPENROUTER_BASE_URL", "https://openrouter.ai/api/v1"),
            openai_api_key: var_or_empty("OPENAI_API_KEY"),
            openai_model: var_or("OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: var_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            ollama_base_url: var_or("OLLAMA_BASE_URL", "http://localhost:11434"),
            ollama_model: var_or("OLLAMA_MODEL", "llama3.1:8b"),
            pubmed_base_url: var_or("PUBMED_BASE_URL", "https://eutils.ncbi.nlm.nih.gov/entrez/eutils"),
            pubmed_email: var_or_empty("PUBMED_EMAIL"),
            whatsapp_enabled,
            whatsapp_bridge_url: var_or_empty("WHATSAPP_BRIDGE_URL"),
            whatsapp_target_number: var_or_empty("WHATSAPP_TARGET_NUMBER"),
            analytics_retention_days: parsed_or("ANALYTICS_RETENTION_DAYS", 365),
            maintenance_interval_secs: parsed_or("MAINTENANCE_INTERVAL_SECS", 3600),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.session_secret.is_empty() && self.is_ai_configured(self.ai_provider)
    }

    /// Ollama runs locally and needs no key.
    pub fn is_ai_configured(&self, provider: AiProviderKind) -> bool {
        match provider {
            AiProviderKind::OpenRouter => !self.openrouter_api_key.is_empty(),
            AiProviderKind::OpenAi => !self.openai_api_key.is_empty(),
            AiProviderKind::Ollama => !self.ollama_base_url.is_empty(),
        }
    }

    pub fn is_whatsapp_configured(&self) -> bool {
        self.whatsapp_enabled && !self.whatsapp_bridge_url.is_empty()
    }
}
