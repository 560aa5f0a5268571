// =====================================================================================
// MONITORING CELL - ANALYTICS & HEALTH
// =====================================================================================
//
// - Analytics events (searches, doctor clicks, logins, reservations)
// - Dashboard summary for the admin panel
// - Database health check
// - Retention pruning for the maintenance job
//
// =====================================================================================

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{event_types, AnalyticsEvent, DashboardSummary, HealthReport, HealthStatus, MonitoringError};
pub use router::monitoring_routes;
pub use services::{AnalyticsService, HealthMonitorService};
