pub mod analytics;
pub mod health;

pub use analytics::AnalyticsService;
pub use health::HealthMonitorService;
