//! Periodic housekeeping: expire stale reservations and prune old analytics.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use monitoring_cell::AnalyticsService;
use reservation_cell::services::validation::hk_today;
use reservation_cell::ReservationService;
use shared_database::AppState;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub reservations_expired: u64,
    pub events_pruned: u64,
}

/// One pass. Each step logs its own failure and the other still runs.
pub async fn run_once(state: &AppState) -> MaintenanceReport {
    let mut report = MaintenanceReport::default();

    match ReservationService::new(state).expire_stale(hk_today()).await {
        Ok(expired) => report.reservations_expired = expired,
        Err(e) => error!("Failed to expire stale reservations: {}", e),
    }

    match AnalyticsService::new(state)
        .prune(state.config.analytics_retention_days)
        .await
    {
        Ok(pruned) => report.events_pruned = pruned,
        Err(e) => error!("Failed to prune analytics: {}", e),
    }

    debug!("Maintenance pass finished: {:?}", report);
    report
}

pub fn spawn(state: Arc<AppState>) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.maintenance_interval_secs.max(60));
    info!("Maintenance job every {}s", period.as_secs());

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            run_once(&state).await;
        }
    })
}
