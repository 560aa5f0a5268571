//! Bulk doctor import/export in CSV.
//!
//! The header row uses the column names of the `doctors` table. Imports
//! ignore columns they do not know and skip rows that fail validation,
//! reporting them by line. A `Replace` import of an export restores ids
//! and affiliation as they were.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use shared_database::AppState;

use crate::models::{
    AffiliationStatus, CreateDoctorRequest, Doctor, DoctorError, ImportMode, ImportReport, ImportRowError,
};
use crate::services::doctor::{insert_doctor, DoctorService, StoredFields};

pub const CSV_HEADERS: &[&str] = &[
    "id",
    "name_en",
    "name_zh",
    "specialty_en",
    "specialty_zh",
    "qualifications_en",
    "qualifications_zh",
    "languages_en",
    "languages_zh",
    "phone",
    "email",
    "website",
    "address_en",
    "address_zh",
    "district",
    "priority_flag",
    "affiliation_status",
    "whatsapp_number",
    "affiliated_at",
];

#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    id: i64,
    name_en: Option<&'a str>,
    name_zh: Option<&'a str>,
    specialty_en: Option<&'a str>,
    specialty_zh: Option<&'a str>,
    qualifications_en: Option<&'a str>,
    qualifications_zh: Option<&'a str>,
    languages_en: Option<&'a str>,
    languages_zh: Option<&'a str>,
    phone: Option<&'a str>,
    email: Option<&'a str>,
    website: Option<&'a str>,
    address_en: Option<&'a str>,
    address_zh: Option<&'a str>,
    district: Option<&'a str>,
    priority_flag: i64,
    affiliation_status: &'static str,
    whatsapp_number: Option<&'a str>,
    affiliated_at: Option<DateTime<Utc>>,
}

impl<'a> From<&'a Doctor> for ExportRecord<'a> {
    fn from(d: &'a Doctor) -> Self {
        Self {
            id: d.id,
            name_en: d.name_en.as_deref(),
            name_zh: d.name_zh.as_deref(),
            specialty_en: d.specialty_en.as_deref(),
            specialty_zh: d.specialty_zh.as_deref(),
            qualifications_en: d.qualifications_en.as_deref(),
            qualifications_zh: d.qualifications_zh.as_deref(),
            languages_en: d.languages_en.as_deref(),
            languages_zh: d.languages_zh.as_deref(),
            phone: d.phone.as_deref(),
            email: d.email.as_deref(),
            website: d.website.as_deref(),
            address_en: d.address_en.as_deref(),
            address_zh: d.address_zh.as_deref(),
            district: d.district.as_deref(),
            priority_flag: d.priority_flag,
            affiliation_status: d.affiliation_status.as_str(),
            whatsapp_number: d.whatsapp_number.as_deref(),
            affiliated_at: d.affiliated_at,
        }
    }
}

/// One imported row. Only `Replace` imports keep `id`.
#[derive(Debug, Deserialize)]
struct ImportRecord {
    id: Option<i64>,
    name_en: Option<String>,
    name_zh: Option<String>,
    specialty_en: Option<String>,
    specialty_zh: Option<String>,
    qualifications_en: Option<String>,
    qualifications_zh: Option<String>,
    languages_en: Option<String>,
    languages_zh: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
    address_en: Option<String>,
    address_zh: Option<String>,
    district: Option<String>,
    priority_flag: Option<i64>,
    affiliation_status: Option<AffiliationStatus>,
    whatsapp_number: Option<String>,
    affiliated_at: Option<DateTime<Utc>>,
}

impl ImportRecord {
    fn split(self, mode: ImportMode) -> (CreateDoctorRequest, StoredFields) {
        let request = CreateDoctorRequest {
            name_en: self.name_en,
            name_zh: self.name_zh,
            specialty_en: self.specialty_en,
            specialty_zh: self.specialty_zh,
            qualifications_en: self.qualifications_en,
            qualifications_zh: self.qualifications_zh,
            languages_en: self.languages_en,
            languages_zh: self.languages_zh,
            phone: self.phone,
            email: self.email,
            website: self.website,
            address_en: self.address_en,
            address_zh: self.address_zh,
            district: self.district,
            priority_flag: self.priority_flag,
        };
        let stored = StoredFields {
            id: self.id.filter(|_| mode == ImportMode::Replace),
            affiliation_status: self.affiliation_status,
            whatsapp_number: self.whatsapp_number,
            affiliated_at: self.affiliated_at,
        };
        (request, stored)
    }
}

pub struct DoctorCsvService {
    db: SqlitePool,
}

impl DoctorCsvService {
    pub fn new(state: &AppState) -> Self {
        Self::from_pool(state.doctors_db.pool().clone())
    }

    pub fn from_pool(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Import `data` in one transaction. In `Replace` mode the directory is
    /// emptied first.
    pub async fn import(&self, data: &str, mode: ImportMode) -> Result<ImportReport, DoctorError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(data.as_bytes());

        // Bad headers fail the whole import before anything is touched.
        let headers = reader.headers()?.clone();

        let mut tx = self.db.begin().await?;

        if mode == ImportMode::Replace {
            let removed = sqlx::query("DELETE FROM doctors").execute(&mut *tx).await?;
            info!("Replacing directory, removed {} doctors", removed.rows_affected());
        }

        let mut report = ImportReport::default();
        let mut seen_ids = HashSet::new();
        let mut raw = csv::StringRecord::new();

        while reader.read_record(&mut raw)? {
            // Where the record starts, so quoted multi-line cells count fully.
            let line = raw.position().map(|p| p.line() as usize).unwrap_or_default();

            let record = match raw.deserialize::<ImportRecord>(Some(&headers)) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping CSV line {}: {}", line, e);
                    report.skipped.push(ImportRowError { line, error: e.to_string() });
                    continue;
                }
            };

            let (request, stored) = record.split(mode);

            if let Err(e) = request.validate() {
                report.skipped.push(ImportRowError { line, error: e.to_string() });
                continue;
            }

            if let Some(id) = stored.id {
                if !seen_ids.insert(id) {
                    report.skipped.push(ImportRowError {
                        line,
                        error: format!("Duplicate id {}", id),
                    });
                    continue;
                }
            }

            insert_doctor(&mut *tx, request, stored).await?;
            report.imported += 1;
        }

        tx.commit().await?;

        info!("Imported {} doctors, skipped {} rows", report.imported, report.skipped.len());
        Ok(report)
    }

    pub async fn export(&self) -> Result<String, DoctorError> {
        let doctors = DoctorService::from_pool(self.db.clone()).list_all().await?;

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        writer.write_record(CSV_HEADERS)?;
        for doctor in &doctors {
            writer.serialize(ExportRecord::from(doctor))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| DoctorError::Validation(format!("Failed to finish CSV export: {}", e)))?;

        String::from_utf8(bytes).map_err(|e| DoctorError::Validation(format!("CSV export is not UTF-8: {}", e)))
    }
}
