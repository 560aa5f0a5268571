use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use shared_database::AppState;
use shared_models::pagination::{Page, PageParams};

use crate::models::{AnalysisError, NewUserQuery, SevereCase, UserQuery};

const QUERY_COLUMNS: &str = "id, age, gender, symptoms, chronic_conditions, language, location, \
    detailed_health_info, ai_provider, ai_response, recommended_specialties, severity, matched_doctors, \
    pubmed_references, created_at";

const SEVERE_CASE_COLUMNS: &str = "id, query_id, age, gender, symptoms, matched_keywords, handled, created_at";

const EXPORT_HEADERS: &[&str] = &[
    "id",
    "created_at",
    "age",
    "gender",
    "symptoms",
    "chronic_conditions",
    "language",
    "location",
    "ai_provider",
    "recommended_specialties",
    "severity",
];

/// Storage for `user_queries` and `severe_cases`.
pub struct QueryService {
    db: SqlitePool,
}

impl QueryService {
    pub fn new(state: &AppState) -> Self {
        Self::from_pool(state.admin_db.pool().clone())
    }

    pub fn from_pool(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn save(&self, query: NewUserQuery) -> Result<i64, AnalysisError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_queries (
                age, gender, symptoms, chronic_conditions, language, location, detailed_health_info,
                ai_provider, ai_response, recommended_specialties, severity, matched_doctors,
                pubmed_references, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(query.age)
        .bind(query.gender)
        .bind(query.symptoms)
        .bind(query.chronic_conditions)
        .bind(query.language)
        .bind(query.location)
        .bind(query.detailed_health_info)
        .bind(query.ai_provider)
        .bind(query.ai_response)
        .bind(query.recommended_specialties)
        .bind(query.severity)
        .bind(query.matched_doctors)
        .bind(query.pubmed_references)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Stored user query {}", id);
        Ok(id)
    }

    pub async fn get(&self, query_id: i64) -> Result<UserQuery, AnalysisError> {
        sqlx::query_as::<_, UserQuery>(&format!("SELECT {} FROM user_queries WHERE id = ?", QUERY_COLUMNS))
            .bind(query_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AnalysisError::QueryNotFound(query_id))
    }

    /// Newest first.
    pub async fn list(&self, params: &PageParams) -> Result<Page<UserQuery>, AnalysisError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_queries")
            .fetch_one(&self.db)
            .await?;

        let items = sqlx::query_as::<_, UserQuery>(&format!(
            "SELECT {} FROM user_queries ORDER BY id DESC LIMIT ? OFFSET ?",
            QUERY_COLUMNS
        ))
        .bind(params.per_page())
        .bind(params.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(Page::new(items, total, params))
    }

    pub async fn export_csv(&self) -> Result<String, AnalysisError> {
        let queries = sqlx::query_as::<_, UserQuery>(&format!("SELECT {} FROM user_queries ORDER BY id", QUERY_COLUMNS))
            .fetch_all(&self.db)
            .await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(EXPORT_HEADERS)?;
        for q in &queries {
            writer.write_record([
                q.id.to_string(),
                q.created_at.to_rfc3339(),
                q.age.map(|a| a.to_string()).unwrap_or_default(),
                q.gender.clone().unwrap_or_default(),
                q.symptoms.clone(),
                q.chronic_conditions.clone().unwrap_or_default(),
                q.language.clone().unwrap_or_default(),
                q.location.clone().unwrap_or_default(),
                q.ai_provider.clone().unwrap_or_default(),
                q.recommended_specialties.clone().unwrap_or_default(),
                q.severity.clone().unwrap_or_default(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| AnalysisError::Validation(format!("Failed to finish CSV export: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| AnalysisError::Validation(format!("CSV export is not UTF-8: {}", e)))
    }

    pub async fn record_severe_case(
        &self,
        query_id: i64,
        age: Option<i64>,
        gender: Option<&str>,
        symptoms: &str,
        keywords: &[String],
    ) -> Result<i64, AnalysisError> {
        let keywords_json = serde_json::to_string(keywords).unwrap_or_else(|_| "[]".to_string());

        let result = sqlx::query(
            "INSERT INTO severe_cases (query_id, age, gender, symptoms, matched_keywords, handled, created_at) \
             VALUES (?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(query_id)
        .bind(age)
        .bind(gender)
        .bind(symptoms)
        .bind(keywords_json)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        info!("Severe case recorded for query {}", query_id);
        Ok(result.last_insert_rowid())
    }

    pub async fn list_severe_cases(&self, handled: Option<bool>) -> Result<Vec<SevereCase>, AnalysisError> {
        let cases = match handled {
            Some(handled) => {
                sqlx::query_as::<_, SevereCase>(&format!(
                    "SELECT {} FROM severe_cases WHERE handled = ? ORDER BY id DESC",
                    SEVERE_CASE_COLUMNS
                ))
                .bind(handled)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, SevereCase>(&format!(
                    "SELECT {} FROM severe_cases ORDER BY handled, id DESC",
                    SEVERE_CASE_COLUMNS
                ))
                .fetch_all(&self.db)
                .await?
            }
        };
        Ok(cases)
    }

    pub async fn mark_handled(&self, case_id: i64) -> Result<(), AnalysisError> {
        let result = sqlx::query("UPDATE severe_cases SET handled = 1 WHERE id = ?")
            .bind(case_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AnalysisError::SevereCaseNotFound(case_id));
        }

        info!("Severe case {} marked handled", case_id);
        Ok(())
    }
}
