use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use shared_config::{AiProviderKind, AppConfig};
use shared_database::{settings, AppState};

use crate::models::AnalysisError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user", content: content.into() }
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, AnalysisError>;
}

/// OpenRouter and OpenAI share the `/chat/completions` API.
pub struct OpenAiCompatible {
    kind: AiProviderKind,
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatible {
    pub fn new(kind: AiProviderKind, http: Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            kind,
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatible {
    fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, AnalysisError> {
        debug!("Calling {} model {}", self.name(), self.model);

        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": TEMPERATURE,
        });

        let mut request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body);

        if self.kind == AiProviderKind::OpenRouter {
            request = request.header("X-Title", "HK Doctor Match");
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("{} API error {}: {}", self.name(), status, error_text);
            return Err(AnalysisError::Provider(format!("{} returned {}", self.name(), status)));
        }

        let reply: Value = response.json().await?;
        reply["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AnalysisError::Provider(format!("Invalid {} response format", self.name())))
    }
}

pub struct Ollama {
    http: Client,
    base_url: String,
    model: String,
}

impl Ollama {
    pub fn new(http: Client, base_url: &str, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ChatProvider for Ollama {
    fn name(&self) -> &'static str {
        AiProviderKind::Ollama.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, AnalysisError> {
        debug!("Calling ollama model {}", self.model);

        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": { "temperature": TEMPERATURE },
        });

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Ollama error {}: {}", status, error_text);
            return Err(AnalysisError::Provider(format!("ollama returned {}", status)));
        }

        let reply: Value = response.json().await?;
        reply["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AnalysisError::Provider("Invalid ollama response format".to_string()))
    }
}

/// Build a provider of `kind` from the environment, optionally overriding
/// its model.
pub fn build_provider(
    config: &AppConfig,
    http: Client,
    kind: AiProviderKind,
    model_override: Option<&str>,
) -> Result<Box<dyn ChatProvider>, AnalysisError> {
    if !config.is_ai_configured(kind) {
        return Err(AnalysisError::NotConfigured(kind.as_str().to_string()));
    }

    let provider: Box<dyn ChatProvider> = match kind {
        AiProviderKind::OpenRouter => Box::new(OpenAiCompatible::new(
            kind,
            http,
            &config.openrouter_base_url,
            &config.openrouter_api_key,
            model_override.unwrap_or(&config.openrouter_model),
        )),
        AiProviderKind::OpenAi => Box::new(OpenAiCompatible::new(
            kind,
            http,
            &config.openai_base_url,
            &config.openai_api_key,
            model_override.unwrap_or(&config.openai_model),
        )),
        AiProviderKind::Ollama => Box::new(Ollama::new(
            http,
            &config.ollama_base_url,
            model_override.unwrap_or(&config.ollama_model),
        )),
    };

    Ok(provider)
}

/// The active provider: `app_config.ai_provider` / `ai_model` when set,
/// otherwise `AI_PROVIDER` and the provider's model from the environment.
pub async fn provider_for(state: &AppState) -> Result<Box<dyn ChatProvider>, AnalysisError> {
    let pool = state.admin_db.pool();

    let kind = match settings::get(pool, settings::AI_PROVIDER).await? {
        Some(raw) => raw.parse::<AiProviderKind>().unwrap_or_else(|e| {
            warn!("{}, using {}", e, state.config.ai_provider.as_str());
            state.config.ai_provider
        }),
        None => state.config.ai_provider,
    };

    let model = settings::get(pool, settings::AI_MODEL)
        .await?
        .filter(|m| !m.trim().is_empty());

    build_provider(&state.config, state.http.clone(), kind, model.as_deref())
}
