// =====================================================================================
// MONITORING CELL MODELS
// =====================================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

use shared_models::error::AppError;

pub mod event_types {
    pub const DOCTOR_SEARCH: &str = "doctor_search";
    pub const DOCTOR_CLICK: &str = "doctor_click";
    pub const ADMIN_LOGIN: &str = "admin_login";
    pub const RESERVATION_CREATED: &str = "reservation_created";
    pub const SEVERE_CASE: &str = "severe_case";
}

pub const DEFAULT_SUMMARY_DAYS: i64 = 30;
pub const MAX_SUMMARY_DAYS: i64 = 365;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnalyticsEvent {
    pub id: i64,
    pub event_type: String,
    pub event_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct CountEntry {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub days: i64,
    pub since: DateTime<Utc>,
    pub total_queries: i64,
    pub events_by_type: Vec<CountEntry>,
    pub queries_per_day: Vec<CountEntry>,
    pub top_specialties: Vec<CountEntry>,
    pub reservations_by_status: Vec<CountEntry>,
    pub unhandled_severe_cases: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<i64>,
}

impl SummaryQuery {
    pub fn days(&self) -> i64 {
        self.days.unwrap_or(DEFAULT_SUMMARY_DAYS).clamp(1, MAX_SUMMARY_DAYS)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickRequest {
    pub doctor_id: i64,
    pub query_id: Option<i64>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub component: &'static str,
    pub status: HealthStatus,
    pub response_time_ms: u64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: &'static str,
    pub components: Vec<ComponentHealth>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum MonitoringError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

impl From<MonitoringError> for AppError {
    fn from(err: MonitoringError) -> Self {
        match err {
            MonitoringError::Database(e) => AppError::from(e),
            MonitoringError::InvalidEvent(msg) => AppError::ValidationError(msg),
        }
    }
}
