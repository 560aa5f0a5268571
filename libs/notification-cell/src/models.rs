use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of the bridge's `POST /send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppMessage {
    pub to: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("WhatsApp notifications are disabled")]
    Disabled,

    #[error("No WhatsApp recipient configured")]
    MissingRecipient,

    #[error("WhatsApp bridge request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WhatsApp bridge rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}
