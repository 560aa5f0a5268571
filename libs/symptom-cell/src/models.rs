use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use thiserror::Error;

use doctor_cell::models::{DoctorError, DoctorMatch};
use doctor_cell::services::locations::LocationSelection;
use shared_models::error::AppError;

pub const MAX_AGE: i64 = 150;
pub const MAX_SYMPTOMS_CHARS: usize = 5000;

/// Patient submission for `/find_doctor`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymptomRequest {
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub symptoms: String,
    pub chronic_conditions: Option<String>,
    /// Preferred consultation language.
    pub language: Option<String>,
    /// Language of the AI reply: `en` or `zh-TW`.
    pub ui_language: Option<String>,
    #[serde(default)]
    pub location: LocationSelection,
    pub detailed_health_info: Option<Value>,
}

impl SymptomRequest {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.symptoms.trim().is_empty() {
            return Err(AnalysisError::Validation("symptoms are required".to_string()));
        }
        if self.symptoms.chars().count() > MAX_SYMPTOMS_CHARS {
            return Err(AnalysisError::Validation(format!(
                "symptoms must be at most {} characters",
                MAX_SYMPTOMS_CHARS
            )));
        }
        if let Some(age) = self.age {
            if !(0..=MAX_AGE).contains(&age) {
                return Err(AnalysisError::Validation(format!("age must be between 0 and {}", MAX_AGE)));
            }
        }
        Ok(())
    }

    pub fn wants_chinese(&self) -> bool {
        self.ui_language
            .as_deref()
            .map(|l| l.to_lowercase().starts_with("zh"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Accepts English and Chinese labels as LLMs tend to write them.
    ///
    /// A leading label decides. Only when the line starts with something else
    /// are keywords searched, skipping negated ones ("no emergency signs").
    pub fn parse(text: &str) -> Option<Self> {
        let text = text
            .trim()
            .trim_start_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();

        if let Some((_, severity)) = SEVERITY_TERMS.iter().find(|(term, _)| text.starts_with(term)) {
            return Some(*severity);
        }

        [Severity::High, Severity::Medium, Severity::Low].into_iter().find(|severity| {
            SEVERITY_TERMS
                .iter()
                .filter(|(_, s)| s == severity)
                .any(|(term, _)| mentions(&text, term))
        })
    }
}

const SEVERITY_TERMS: &[(&str, Severity)] = &[
    ("high", Severity::High),
    ("severe", Severity::High),
    ("emergency", Severity::High),
    ("高", Severity::High),
    ("嚴重", Severity::High),
    ("medium", Severity::Medium),
    ("moderate", Severity::Medium),
    ("中", Severity::Medium),
    ("low", Severity::Low),
    ("mild", Severity::Low),
    ("低", Severity::Low),
    ("輕", Severity::Low),
];

const NEGATIONS: &[&str] = &["no", "not", "non-", "without", "無", "不", "沒有", "非"];

/// True when `term` occurs in `text` without a negation right before it.
fn mentions(text: &str, term: &str) -> bool {
    text.match_indices(term).any(|(at, _)| {
        let before = text[..at].trim_end();
        !NEGATIONS.iter().any(|negation| before.ends_with(negation))
    })
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendedSpecialty {
    pub key: &'static str,
    pub name_en: &'static str,
    pub name_zh: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub specialties: Vec<RecommendedSpecialty>,
    pub severity: Severity,
    pub summary: String,
    pub provider: String,
    /// True when the LLM could not be reached and GP was assumed.
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub pmid: String,
    pub title: String,
    pub journal: String,
    pub pub_date: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmergencyNotice {
    pub keywords: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FindDoctorResponse {
    pub query_id: i64,
    pub analysis: Analysis,
    pub doctors: Vec<DoctorMatch>,
    pub references: Vec<Reference>,
    pub emergency: Option<EmergencyNotice>,
}

/// A stored `user_queries` row.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserQuery {
    pub id: i64,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub symptoms: String,
    pub chronic_conditions: Option<String>,
    pub language: Option<String>,
    pub location: Option<String>,
    pub detailed_health_info: Option<String>,
    pub ai_provider: Option<String>,
    pub ai_response: Option<String>,
    pub recommended_specialties: Option<String>,
    pub severity: Option<String>,
    pub matched_doctors: Option<String>,
    pub pubmed_references: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Values written for a new `user_queries` row; JSON columns are already
/// serialised.
#[derive(Debug, Clone, Default)]
pub struct NewUserQuery {
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub symptoms: String,
    pub chronic_conditions: Option<String>,
    pub language: Option<String>,
    pub location: Option<String>,
    pub detailed_health_info: Option<String>,
    pub ai_provider: Option<String>,
    pub ai_response: Option<String>,
    pub recommended_specialties: Option<String>,
    pub severity: Option<String>,
    pub matched_doctors: Option<String>,
    pub pubmed_references: Option<String>,
}

/// `GET /report/{id}`: the stored query with JSON columns decoded.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub id: i64,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub symptoms: String,
    pub chronic_conditions: Option<String>,
    pub language: Option<String>,
    pub location: Value,
    pub detailed_health_info: Value,
    pub ai_provider: Option<String>,
    pub ai_response: Option<String>,
    pub recommended_specialties: Value,
    pub severity: Option<String>,
    pub doctors: Value,
    pub references: Value,
    pub created_at: DateTime<Utc>,
}

fn decode(column: &Option<String>, empty: Value) -> Value {
    column
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or(empty)
}

impl From<UserQuery> for QueryReport {
    fn from(q: UserQuery) -> Self {
        Self {
            location: decode(&q.location, Value::Null),
            detailed_health_info: decode(&q.detailed_health_info, Value::Null),
            recommended_specialties: decode(&q.recommended_specialties, Value::Array(Vec::new())),
            doctors: decode(&q.matched_doctors, Value::Array(Vec::new())),
            references: decode(&q.pubmed_references, Value::Array(Vec::new())),
            id: q.id,
            age: q.age,
            gender: q.gender,
            symptoms: q.symptoms,
            chronic_conditions: q.chronic_conditions,
            language: q.language,
            ai_provider: q.ai_provider,
            ai_response: q.ai_response,
            severity: q.severity,
            created_at: q.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SevereCase {
    pub id: i64,
    pub query_id: Option<i64>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub symptoms: String,
    pub matched_keywords: String,
    pub handled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SevereCaseQuery {
    pub handled: Option<bool>,
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("AI provider {0} is not configured")]
    NotConfigured(String),

    #[error("AI provider error: {0}")]
    Provider(String),

    #[error("Query {0} not found")]
    QueryNotFound(i64),

    #[error("Severe case {0} not found")]
    SevereCaseNotFound(i64),

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        AnalysisError::Provider(err.to_string())
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Validation(msg) => AppError::ValidationError(msg),
            AnalysisError::NotConfigured(_) | AnalysisError::Provider(_) => AppError::ExternalService(err.to_string()),
            AnalysisError::QueryNotFound(_) | AnalysisError::SevereCaseNotFound(_) => AppError::NotFound(err.to_string()),
            AnalysisError::Doctor(e) => e.into(),
            AnalysisError::Csv(e) => AppError::Internal(format!("CSV export failed: {}", e)),
            AnalysisError::Database(e) => AppError::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_symptoms_and_age() {
        let mut request = SymptomRequest {
            symptoms: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(request.validate(), Err(AnalysisError::Validation(_))));

        request.symptoms = "headache".to_string();
        request.age = Some(151);
        assert!(request.validate().is_err());

        request.age = Some(0);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn parses_severity_labels() {
        assert_eq!(Severity::parse("High - seek care"), Some(Severity::High));
        assert_eq!(Severity::parse("moderate"), Some(Severity::Medium));
        assert_eq!(Severity::parse("低"), Some(Severity::Low));
        assert_eq!(Severity::parse("unclear"), None);
        assert_eq!(Severity::parse("**Medium**"), Some(Severity::Medium));
    }

    #[test]
    fn negated_wording_does_not_raise_severity() {
        assert_eq!(Severity::parse("Low (no emergency signs)"), Some(Severity::Low));
        assert_eq!(Severity::parse("Medium, not severe"), Some(Severity::Medium));
        assert_eq!(Severity::parse("No emergency, probably mild"), Some(Severity::Low));
        assert_eq!(Severity::parse("Likely severe"), Some(Severity::High));
        assert_eq!(Severity::parse("不嚴重，輕微"), Some(Severity::Low));
    }

    #[test]
    fn report_decodes_json_columns() {
        let query = UserQuery {
            id: 1,
            age: Some(30),
            gender: None,
            symptoms: "cough".to_string(),
            chronic_conditions: None,
            language: None,
            location: Some(r#"{"region":"Kowloon"}"#.to_string()),
            detailed_health_info: None,
            ai_provider: None,
            ai_response: None,
            recommended_specialties: Some("garbage".to_string()),
            severity: None,
            matched_doctors: None,
            pubmed_references: None,
            created_at: Utc::now(),
        };

        let report = QueryReport::from(query);
        assert_eq!(report.location["region"], "Kowloon");
        assert_eq!(report.recommended_specialties, Value::Array(Vec::new()));
    }
}
