use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use shared_database::AppState;
use shared_models::pagination::{Page, PageParams};

use crate::models::{
    AffiliationStatus, CreateDoctorRequest, Doctor, DoctorError, DoctorSearchQuery, UpdateDoctorRequest,
};

pub const DOCTOR_COLUMNS: &str = "id, name_en, name_zh, specialty_en, specialty_zh, \
    qualifications_en, qualifications_zh, languages_en, languages_zh, phone, email, website, \
    address_en, address_zh, district, priority_flag, affiliation_status, whatsapp_number, \
    affiliated_at, created_at, updated_at";

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn like(value: &str) -> String {
    format!("%{}%", value.trim())
}

pub struct DoctorService {
    db: SqlitePool,
}

impl DoctorService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.doctors_db.pool().clone(),
        }
    }

    pub fn from_pool(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Every doctor in directory order.
    pub async fn list_all(&self) -> Result<Vec<Doctor>, DoctorError> {
        let doctors = sqlx::query_as::<_, Doctor>(&format!("SELECT {} FROM doctors ORDER BY id", DOCTOR_COLUMNS))
            .fetch_all(&self.db)
            .await?;
        Ok(doctors)
    }

    pub async fn get_doctor(&self, doctor_id: i64) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        sqlx::query_as::<_, Doctor>(&format!("SELECT {} FROM doctors WHERE id = ?", DOCTOR_COLUMNS))
            .bind(doctor_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(DoctorError::NotFound(doctor_id))
    }

    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        request.validate()?;
        let id = insert_doctor(&self.db, request, StoredFields::default()).await?;
        info!("Doctor {} created", id);
        self.get_doctor(id).await
    }

    /// Only the fields present in `request` change. The resulting record must
    /// still satisfy the rules for a new doctor.
    pub async fn update_doctor(&self, doctor_id: i64, request: UpdateDoctorRequest) -> Result<Doctor, DoctorError> {
        request.validate()?;
        debug!("Updating doctor: {}", doctor_id);

        let current = self.get_doctor(doctor_id).await?;
        request.merged_with(&current).validate()?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE doctors SET updated_at = ");
        builder.push_bind(Utc::now());

        let text_fields = [
            ("name_en", request.name_en),
            ("name_zh", request.name_zh),
            ("specialty_en", request.specialty_en),
            ("specialty_zh", request.specialty_zh),
            ("qualifications_en", request.qualifications_en),
            ("qualifications_zh", request.qualifications_zh),
            ("languages_en", request.languages_en),
            ("languages_zh", request.languages_zh),
            ("phone", request.phone),
            ("email", request.email),
            ("website", request.website),
            ("address_en", request.address_en),
            ("address_zh", request.address_zh),
            ("district", request.district),
        ];

        for (column, value) in text_fields {
            if let Some(value) = value {
                builder.push(format!(", {} = ", column));
                // An empty string clears the field.
                builder.push_bind(clean(Some(value)));
            }
        }

        if let Some(priority) = request.priority_flag {
            builder.push(", priority_flag = ");
            builder.push_bind(priority);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(doctor_id);

        let result = builder.build().execute(&self.db).await?;
        if result.rows_affected() == 0 {
            return Err(DoctorError::NotFound(doctor_id));
        }

        self.get_doctor(doctor_id).await
    }

    pub async fn delete_doctor(&self, doctor_id: i64) -> Result<(), DoctorError> {
        let result = sqlx::query("DELETE FROM doctors WHERE id = ?")
            .bind(doctor_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DoctorError::NotFound(doctor_id));
        }

        info!("Doctor {} deleted", doctor_id);
        Ok(())
    }

    pub async fn set_priority(&self, doctor_id: i64, priority_flag: i64) -> Result<Doctor, DoctorError> {
        self.update_doctor(
            doctor_id,
            UpdateDoctorRequest {
                priority_flag: Some(priority_flag),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn count(&self) -> Result<i64, DoctorError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM doctors")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    pub async fn search_doctors(&self, query: &DoctorSearchQuery) -> Result<Page<Doctor>, DoctorError> {
        debug!("Searching doctors with {:?}", query);

        let params = PageParams {
            page: query.page,
            per_page: query.per_page,
        };

        let mut count_builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM doctors WHERE 1 = 1");
        push_filters(&mut count_builder, query);
        let total: i64 = count_builder.build_query_scalar().fetch_one(&self.db).await?;

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM doctors WHERE 1 = 1", DOCTOR_COLUMNS));
        push_filters(&mut builder, query);
        builder.push(" ORDER BY priority_flag DESC, id ASC LIMIT ");
        builder.push_bind(params.per_page());
        builder.push(" OFFSET ");
        builder.push_bind(params.offset());

        let doctors = builder.build_query_as::<Doctor>().fetch_all(&self.db).await?;

        Ok(Page::new(doctors, total, &params))
    }

    /// Doctors with incomplete records, as reported by `hkdoc-admin check`.
    pub async fn find_incomplete(&self) -> Result<Vec<Doctor>, DoctorError> {
        let doctors = sqlx::query_as::<_, Doctor>(&format!(
            "SELECT {} FROM doctors \
             WHERE COALESCE(name_en, '') = '' OR COALESCE(name_zh, '') = '' \
                OR (COALESCE(address_en, '') = '' AND COALESCE(address_zh, '') = '') \
             ORDER BY id",
            DOCTOR_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(doctors)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &DoctorSearchQuery) {
    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        builder.push(" AND (");
        let columns = ["name_en", "name_zh", "specialty_en", "specialty_zh", "address_en", "address_zh"];
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder.push(format!("{} LIKE ", column));
            builder.push_bind(like(q));
        }
        builder.push(")");
    }

    if let Some(specialty) = query.specialty.as_deref().filter(|s| !s.trim().is_empty()) {
        builder.push(" AND (specialty_en LIKE ");
        builder.push_bind(like(specialty));
        builder.push(" OR specialty_zh LIKE ");
        builder.push_bind(like(specialty));
        builder.push(")");
    }

    if let Some(language) = query.language.as_deref().filter(|l| !l.trim().is_empty()) {
        builder.push(" AND (languages_en LIKE ");
        builder.push_bind(like(language));
        builder.push(" OR languages_zh LIKE ");
        builder.push_bind(like(language));
        builder.push(")");
    }

    if let Some(district) = query.district.as_deref().filter(|d| !d.trim().is_empty()) {
        builder.push(" AND (district LIKE ");
        builder.push_bind(like(district));
        builder.push(" OR address_en LIKE ");
        builder.push_bind(like(district));
        builder.push(" OR address_zh LIKE ");
        builder.push_bind(like(district));
        builder.push(")");
    }

    if query.affiliated_only.unwrap_or(false) {
        builder.push(" AND affiliation_status = 'affiliated'");
    }
}

/// Columns a new doctor starts without but a restored export carries.
#[derive(Debug, Clone, Default)]
pub(crate) struct StoredFields {
    pub id: Option<i64>,
    pub affiliation_status: Option<AffiliationStatus>,
    pub whatsapp_number: Option<String>,
    pub affiliated_at: Option<DateTime<Utc>>,
}

/// Insert one validated doctor; works on the pool or inside a transaction.
/// A missing id is assigned by SQLite.
pub(crate) async fn insert_doctor<'e, E>(
    executor: E,
    request: CreateDoctorRequest,
    stored: StoredFields,
) -> Result<i64, DoctorError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let status = stored.affiliation_status.unwrap_or(AffiliationStatus::Unaffiliated);
    let affiliated_at = match status {
        AffiliationStatus::Affiliated | AffiliationStatus::Suspended => Some(stored.affiliated_at.unwrap_or(now)),
        AffiliationStatus::Unaffiliated | AffiliationStatus::Pending => None,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO doctors (
            id, name_en, name_zh, specialty_en, specialty_zh, qualifications_en, qualifications_zh,
            languages_en, languages_zh, phone, email, website, address_en, address_zh, district,
            priority_flag, affiliation_status, whatsapp_number, affiliated_at, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(stored.id)
    .bind(clean(request.name_en))
    .bind(clean(request.name_zh))
    .bind(clean(request.specialty_en))
    .bind(clean(request.specialty_zh))
    .bind(clean(request.qualifications_en))
    .bind(clean(request.qualifications_zh))
    .bind(clean(request.languages_en))
    .bind(clean(request.languages_zh))
    .bind(clean(request.phone))
    .bind(clean(request.email))
    .bind(clean(request.website))
    .bind(clean(request.address_en))
    .bind(clean(request.address_zh))
    .bind(clean(request.district))
    .bind(request.priority_flag.unwrap_or(0))
    .bind(status)
    .bind(clean(stored.whatsapp_number))
    .bind(affiliated_at)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}
