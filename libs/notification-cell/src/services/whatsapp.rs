use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use shared_database::{settings, AppState};

use crate::models::{NotificationError, WhatsAppMessage};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the WhatsApp bridge sidecar.
///
/// Sends never fail the request that caused them: [`WhatsAppNotifier::notify`]
/// spawns the HTTP call and only logs the outcome.
#[derive(Clone)]
pub struct WhatsAppNotifier {
    http: Client,
    bridge_url: String,
    default_recipient: Option<String>,
    enabled: bool,
}

impl WhatsAppNotifier {
    pub fn new(http: Client, bridge_url: &str, default_recipient: Option<String>, enabled: bool) -> Self {
        Self {
            http,
            bridge_url: bridge_url.trim_end_matches('/').to_string(),
            default_recipient: default_recipient.filter(|r| !r.trim().is_empty()),
            enabled: enabled && !bridge_url.trim().is_empty(),
        }
    }

    /// Environment settings, overridden by `whatsapp_enabled` and
    /// `whatsapp_target` in `app_config` when present.
    pub async fn from_state(state: &AppState) -> Self {
        let config = &state.config;
        let pool = state.admin_db.pool();

        let enabled = match settings::get(pool, settings::WHATSAPP_ENABLED).await {
            Ok(Some(value)) => settings::parse_bool(&value),
            Ok(None) => config.whatsapp_enabled,
            Err(e) => {
                warn!("Failed to read WhatsApp override, using environment: {}", e);
                config.whatsapp_enabled
            }
        };

        let recipient = match settings::get(pool, settings::WHATSAPP_TARGET).await {
            Ok(Some(value)) if !value.trim().is_empty() => Some(value),
            Ok(_) => Some(config.whatsapp_target_number.clone()),
            Err(e) => {
                warn!("Failed to read WhatsApp target override: {}", e);
                Some(config.whatsapp_target_number.clone())
            }
        };

        Self::new(state.http.clone(), &config.whatsapp_bridge_url, recipient, enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn default_recipient(&self) -> Option<&str> {
        self.default_recipient.as_deref()
    }

    pub async fn send(&self, to: &str, message: &str) -> Result<(), NotificationError> {
        if !self.enabled {
            return Err(NotificationError::Disabled);
        }
        if to.trim().is_empty() {
            return Err(NotificationError::MissingRecipient);
        }

        debug!("Sending WhatsApp message to {}", to);

        let body = WhatsAppMessage {
            to: to.trim().to_string(),
            message: message.to_string(),
        };

        let response = self
            .http
            .post(format!("{}/send", self.bridge_url))
            .timeout(SEND_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected { status, body });
        }

        info!("WhatsApp message delivered to bridge for {}", to);
        Ok(())
    }

    /// Fire-and-forget send. `to = None` goes to the default recipient.
    /// Returns `None` when nothing was spawned.
    pub fn notify(&self, to: Option<&str>, message: String) -> Option<JoinHandle<()>> {
        if !self.enabled {
            debug!("WhatsApp disabled, dropping notification");
            return None;
        }

        let Some(recipient) = to.map(str::to_string).or_else(|| self.default_recipient.clone()) else {
            warn!("WhatsApp notification has no recipient, dropping it");
            return None;
        };

        let notifier = self.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = notifier.send(&recipient, &message).await {
                error!("WhatsApp notification to {} failed: {}", recipient, e);
            }
        }))
    }
}
