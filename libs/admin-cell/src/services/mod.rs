pub mod accounts;
pub mod app_config;
pub mod password;
pub mod totp;

pub use accounts::AdminAccountService;
pub use app_config::ConfigService;
pub use password::PasswordService;
