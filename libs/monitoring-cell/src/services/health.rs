// =====================================================================================
// HEALTH MONITORING SERVICE
// =====================================================================================

use std::time::Instant;

use tracing::{error, instrument};

use shared_database::{AppState, DbPool};

use crate::models::{ComponentHealth, HealthReport, HealthStatus};

pub struct HealthMonitorService {
    doctors_db: DbPool,
    admin_db: DbPool,
}

impl HealthMonitorService {
    pub fn new(state: &AppState) -> Self {
        Self {
            doctors_db: state.doctors_db.clone(),
            admin_db: state.admin_db.clone(),
        }
    }

    #[instrument(skip(self))]
    pub async fn check(&self) -> HealthReport {
        let components = vec![
            check_database("doctors_db", &self.doctors_db).await,
            check_database("admin_db", &self.admin_db).await,
        ];

        let status = if components.iter().all(|c| c.status == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION"),
            components,
            timestamp: chrono::Utc::now(),
        }
    }
}

async fn check_database(component: &'static str, db: &DbPool) -> ComponentHealth {
    let start = Instant::now();

    match db.ping().await {
        Ok(()) => ComponentHealth {
            component,
            status: HealthStatus::Healthy,
            response_time_ms: start.elapsed().as_millis() as u64,
            error_message: None,
        },
        Err(e) => {
            error!("Health check for {} failed: {}", component, e);
            ComponentHealth {
                component,
                status: HealthStatus::Unhealthy,
                response_time_ms: start.elapsed().as_millis() as u64,
                error_message: Some(e.to_string()),
            }
        }
    }
}
