use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

use shared_models::error::AppError;

use crate::services::locations::LocationSelection;
use crate::services::specialties::Specialty;

pub const MAX_PRIORITY_FLAG: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AffiliationStatus {
    #[serde(rename = "none")]
    #[sqlx(rename = "none")]
    Unaffiliated,
    Pending,
    Affiliated,
    Suspended,
}

impl AffiliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffiliationStatus::Unaffiliated => "none",
            AffiliationStatus::Pending => "pending",
            AffiliationStatus::Affiliated => "affiliated",
            AffiliationStatus::Suspended => "suspended",
        }
    }

    pub fn can_transition_to(&self, next: AffiliationStatus) -> bool {
        use AffiliationStatus::*;
        matches!(
            (self, next),
            (Unaffiliated, Pending)
                | (Unaffiliated, Affiliated)
                | (Pending, Affiliated)
                | (Pending, Unaffiliated)
                | (Affiliated, Suspended)
                | (Affiliated, Unaffiliated)
                | (Suspended, Affiliated)
                | (Suspended, Unaffiliated)
        )
    }
}

impl fmt::Display for AffiliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of `doctors.db.doctors`. Every descriptive field exists in English
/// and Traditional Chinese and either may be missing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub id: i64,
    pub name_en: Option<String>,
    pub name_zh: Option<String>,
    pub specialty_en: Option<String>,
    pub specialty_zh: Option<String>,
    pub qualifications_en: Option<String>,
    pub qualifications_zh: Option<String>,
    pub languages_en: Option<String>,
    pub languages_zh: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address_en: Option<String>,
    pub address_zh: Option<String>,
    pub district: Option<String>,
    pub priority_flag: i64,
    pub affiliation_status: AffiliationStatus,
    #[serde(skip_serializing)]
    pub whatsapp_number: Option<String>,
    pub affiliated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn joined(parts: &[&Option<String>]) -> String {
    parts
        .iter()
        .filter_map(|p| p.as_deref())
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl Doctor {
    pub fn display_name(&self) -> String {
        match (self.name_en.as_deref(), self.name_zh.as_deref()) {
            (Some(en), Some(zh)) if !en.is_empty() && !zh.is_empty() => format!("{} {}", en, zh),
            (Some(en), _) if !en.is_empty() => en.to_string(),
            (_, Some(zh)) => zh.to_string(),
            _ => format!("Doctor #{}", self.id),
        }
    }

    pub fn specialty_text(&self) -> String {
        joined(&[&self.specialty_en, &self.specialty_zh])
    }

    pub fn language_text(&self) -> String {
        joined(&[&self.languages_en, &self.languages_zh])
    }

    pub fn location_text(&self) -> String {
        joined(&[&self.address_en, &self.address_zh, &self.district])
    }

    pub fn is_affiliated(&self) -> bool {
        self.affiliation_status == AffiliationStatus::Affiliated
    }
}

/// Admin-facing view that includes the private WhatsApp contact.
#[derive(Debug, Clone, Serialize)]
pub struct AdminDoctorView {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub whatsapp_number: Option<String>,
}

impl From<Doctor> for AdminDoctorView {
    fn from(doctor: Doctor) -> Self {
        let whatsapp_number = doctor.whatsapp_number.clone();
        Self { doctor, whatsapp_number }
    }
}

/// Fields for a new doctor. Also the row shape of a CSV import, so unknown
/// CSV columns are ignored and empty cells arrive as `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub name_en: Option<String>,
    pub name_zh: Option<String>,
    pub specialty_en: Option<String>,
    pub specialty_zh: Option<String>,
    pub qualifications_en: Option<String>,
    pub qualifications_zh: Option<String>,
    pub languages_en: Option<String>,
    pub languages_zh: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address_en: Option<String>,
    pub address_zh: Option<String>,
    pub district: Option<String>,
    pub priority_flag: Option<i64>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

impl CreateDoctorRequest {
    pub fn validate(&self) -> Result<(), DoctorError> {
        if is_blank(&self.name_en) && is_blank(&self.name_zh) {
            return Err(DoctorError::Validation("name_en or name_zh is required".to_string()));
        }
        if is_blank(&self.specialty_en) && is_blank(&self.specialty_zh) {
            return Err(DoctorError::Validation("specialty_en or specialty_zh is required".to_string()));
        }
        validate_priority(self.priority_flag)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name_en: Option<String>,
    pub name_zh: Option<String>,
    pub specialty_en: Option<String>,
    pub specialty_zh: Option<String>,
    pub qualifications_en: Option<String>,
    pub qualifications_zh: Option<String>,
    pub languages_en: Option<String>,
    pub languages_zh: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address_en: Option<String>,
    pub address_zh: Option<String>,
    pub district: Option<String>,
    pub priority_flag: Option<i64>,
}

impl UpdateDoctorRequest {
    pub fn validate(&self) -> Result<(), DoctorError> {
        validate_priority(self.priority_flag)
    }

    /// The record `current` becomes once this patch is applied. A present
    /// but empty field clears the stored value.
    pub fn merged_with(&self, current: &Doctor) -> CreateDoctorRequest {
        fn pick(patch: &Option<String>, stored: &Option<String>) -> Option<String> {
            match patch {
                Some(value) => Some(value.trim().to_string()).filter(|v| !v.is_empty()),
                None => stored.clone(),
            }
        }

        CreateDoctorRequest {
            name_en: pick(&self.name_en, &current.name_en),
            name_zh: pick(&self.name_zh, &current.name_zh),
            specialty_en: pick(&self.specialty_en, &current.specialty_en),
            specialty_zh: pick(&self.specialty_zh, &current.specialty_zh),
            qualifications_en: pick(&self.qualifications_en, &current.qualifications_en),
            qualifications_zh: pick(&self.qualifications_zh, &current.qualifications_zh),
            languages_en: pick(&self.languages_en, &current.languages_en),
            languages_zh: pick(&self.languages_zh, &current.languages_zh),
            phone: pick(&self.phone, &current.phone),
            email: pick(&self.email, &current.email),
            website: pick(&self.website, &current.website),
            address_en: pick(&self.address_en, &current.address_en),
            address_zh: pick(&self.address_zh, &current.address_zh),
            district: pick(&self.district, &current.district),
            priority_flag: Some(self.priority_flag.unwrap_or(current.priority_flag)),
        }
    }
}

fn validate_priority(priority: Option<i64>) -> Result<(), DoctorError> {
    match priority {
        Some(p) if !(0..=MAX_PRIORITY_FLAG).contains(&p) => Err(DoctorError::Validation(format!(
            "priority_flag must be between 0 and {}",
            MAX_PRIORITY_FLAG
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorSearchQuery {
    pub q: Option<String>,
    pub specialty: Option<String>,
    pub language: Option<String>,
    pub district: Option<String>,
    pub affiliated_only: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AffiliationUpdateRequest {
    pub status: AffiliationStatus,
    pub whatsapp_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AffiliationApplication {
    pub whatsapp_number: Option<String>,
}

/// Location match level; higher is closer to the patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationTier {
    #[serde(rename = "none")]
    Unmatched = 0,
    Region = 1,
    District = 2,
    Area = 3,
}

impl LocationTier {
    pub fn points(&self) -> i64 {
        match self {
            LocationTier::Unmatched => 0,
            LocationTier::Region => 30,
            LocationTier::District => 45,
            LocationTier::Area => 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchCriteria {
    pub specialties: Vec<&'static Specialty>,
    pub language: Option<String>,
    pub location: LocationSelection,
    pub max_results: usize,
}

impl Default for MatchCriteria {
    fn default() -> Self {
        Self {
            specialties: Vec::new(),
            language: None,
            location: LocationSelection::default(),
            max_results: crate::services::matching::DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorMatch {
    pub doctor: Doctor,
    pub score: i64,
    pub location_tier: LocationTier,
    pub specialty_matched: bool,
    pub language_matched: bool,
    pub is_fallback: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRowError {
    pub line: usize,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<ImportRowError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    #[default]
    Append,
    Replace,
}

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor {0} not found")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot change affiliation from {from} to {to}")]
    InvalidAffiliationTransition {
        from: AffiliationStatus,
        to: AffiliationStatus,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound(_) => AppError::NotFound(err.to_string()),
            DoctorError::Validation(msg) => AppError::ValidationError(msg),
            DoctorError::InvalidAffiliationTransition { .. } => AppError::Conflict(err.to_string()),
            DoctorError::Csv(e) => AppError::BadRequest(format!("Invalid CSV: {}", e)),
            DoctorError::Database(e) => AppError::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affiliation_transitions() {
        use AffiliationStatus::*;
        assert!(Unaffiliated.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Affiliated));
        assert!(Affiliated.can_transition_to(Suspended));
        assert!(Suspended.can_transition_to(Affiliated));
        assert!(!Unaffiliated.can_transition_to(Suspended));
        assert!(!Affiliated.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn create_request_needs_a_name_and_specialty() {
        let mut request = CreateDoctorRequest {
            name_zh: Some("陳大文".to_string()),
            ..Default::default()
        };
        assert!(matches!(request.validate(), Err(DoctorError::Validation(_))));

        request.specialty_en = Some("Cardiology".to_string());
        assert!(request.validate().is_ok());

        request.priority_flag = Some(11);
        assert!(request.validate().is_err());
    }

    #[test]
    fn tiers_order_by_closeness() {
        assert!(LocationTier::Area > LocationTier::District);
        assert!(LocationTier::District > LocationTier::Region);
        assert!(LocationTier::Region > LocationTier::Unmatched);
        assert_eq!(LocationTier::District.points(), 45);
    }
}
