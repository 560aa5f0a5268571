// =====================================================================================
// ANALYTICS SERVICE
// =====================================================================================

use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, info, instrument, warn};

use shared_database::AppState;

use crate::models::{AnalyticsEvent, CountEntry, DashboardSummary, MonitoringError};

const TOP_SPECIALTIES: usize = 10;

#[derive(Clone)]
pub struct AnalyticsService {
    db: SqlitePool,
}

impl AnalyticsService {
    pub fn new(state: &AppState) -> Self {
        Self::from_pool(state.admin_db.pool().clone())
    }

    pub fn from_pool(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn record(&self, event_type: &str, data: &Value) -> Result<i64, MonitoringError> {
        if event_type.trim().is_empty() {
            return Err(MonitoringError::InvalidEvent("event_type is required".to_string()));
        }

        let result = sqlx::query("INSERT INTO analytics (event_type, event_data, created_at) VALUES (?, ?, ?)")
            .bind(event_type)
            .bind(data.to_string())
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        debug!("Recorded analytics event {}", event_type);
        Ok(result.last_insert_rowid())
    }

    /// Record without holding up the caller. Failures are only logged.
    pub fn record_detached(&self, event_type: &'static str, data: Value) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.record(event_type, &data).await {
                warn!("Failed to record analytics event {}: {}", event_type, e);
            }
        });
    }

    pub async fn recent_events(&self, event_type: &str, limit: i64) -> Result<Vec<AnalyticsEvent>, MonitoringError> {
        let events = sqlx::query_as::<_, AnalyticsEvent>(
            "SELECT id, event_type, event_data, created_at FROM analytics \
             WHERE event_type = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(event_type)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(events)
    }

    #[instrument(skip(self))]
    pub async fn summary(&self, days: i64) -> Result<DashboardSummary, MonitoringError> {
        let since = Utc::now() - Duration::days(days);

        let events_by_type = sqlx::query_as::<_, CountEntry>(
            "SELECT event_type AS key, COUNT(*) AS count FROM analytics \
             WHERE created_at >= ? GROUP BY event_type ORDER BY count DESC, key",
        )
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        let queries_per_day = sqlx::query_as::<_, CountEntry>(
            "SELECT substr(created_at, 1, 10) AS key, COUNT(*) AS count FROM user_queries \
             WHERE created_at >= ? GROUP BY key ORDER BY key",
        )
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        let total_queries = queries_per_day.iter().map(|d| d.count).sum();

        let specialty_lists: Vec<Option<String>> =
            sqlx::query_scalar("SELECT recommended_specialties FROM user_queries WHERE created_at >= ?")
                .bind(since)
                .fetch_all(&self.db)
                .await?;

        let reservations_by_status = sqlx::query_as::<_, CountEntry>(
            "SELECT status AS key, COUNT(*) AS count FROM reservations \
             WHERE created_at >= ? GROUP BY status ORDER BY key",
        )
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        let unhandled_severe_cases: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM severe_cases WHERE handled = 0")
            .fetch_one(&self.db)
            .await?;

        Ok(DashboardSummary {
            days,
            since,
            total_queries,
            events_by_type,
            queries_per_day,
            top_specialties: count_specialties(&specialty_lists),
            reservations_by_status,
            unhandled_severe_cases,
        })
    }

    /// Delete events older than `retention_days`.
    pub async fn prune(&self, retention_days: i64) -> Result<u64, MonitoringError> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let result = sqlx::query("DELETE FROM analytics WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.db)
            .await?;

        if result.rows_affected() > 0 {
            info!("Pruned {} analytics events older than {} days", result.rows_affected(), retention_days);
        }
        Ok(result.rows_affected())
    }
}

/// Tally specialty names across stored JSON arrays; rows that are not arrays
/// are ignored.
fn count_specialties(lists: &[Option<String>]) -> Vec<CountEntry> {
    let mut counts: HashMap<String, i64> = HashMap::new();
    for list in lists.iter().flatten() {
        let Ok(names) = serde_json::from_str::<Vec<String>>(list) else {
            continue;
        };
        for name in names {
            *counts.entry(name).or_default() += 1;
        }
    }

    let mut entries: Vec<CountEntry> = counts.into_iter().map(|(key, count)| CountEntry { key, count }).collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    entries.truncate(TOP_SPECIALTIES);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_specialties_across_rows() {
        let lists = vec![
            Some(r#"["Cardiology","General Practitioner"]"#.to_string()),
            Some(r#"["Cardiology"]"#.to_string()),
            Some("not json".to_string()),
            None,
        ];

        let counts = count_specialties(&lists);
        assert_eq!(counts[0], CountEntry { key: "Cardiology".to_string(), count: 2 });
        assert_eq!(counts[1].key, "General Practitioner");
        assert_eq!(counts.len(), 2);
    }
}
