pub mod models;
pub mod services;

pub use models::{NotificationError, WhatsAppMessage};
pub use services::whatsapp::WhatsAppNotifier;
