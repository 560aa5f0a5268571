use chrono::{NaiveDate, Utc};
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info, instrument, warn};

use doctor_cell::services::DoctorService;
use monitoring_cell::models::event_types;
use monitoring_cell::services::AnalyticsService;
use notification_cell::services::templates;
use notification_cell::WhatsAppNotifier;
use shared_database::AppState;
use shared_models::pagination::{Page, PageParams};

use crate::models::{CreateReservationRequest, Reservation, ReservationError, ReservationListQuery, ReservationStatus};
use crate::services::lifecycle::ReservationLifecycleService;
use crate::services::validation::validate_request;

const RESERVATION_COLUMNS: &str = "id, doctor_id, query_id, patient_name, patient_phone, preferred_date, \
    preferred_time, notes, status, created_at, updated_at";

pub struct ReservationService {
    db: SqlitePool,
    doctors: DoctorService,
    analytics: AnalyticsService,
    lifecycle: ReservationLifecycleService,
    notifier: Option<WhatsAppNotifier>,
}

impl ReservationService {
    pub fn new(state: &AppState) -> Self {
        Self::from_pools(state.admin_db.pool().clone(), state.doctors_db.pool().clone())
    }

    pub fn from_pools(admin_db: SqlitePool, doctors_db: SqlitePool) -> Self {
        Self {
            analytics: AnalyticsService::from_pool(admin_db.clone()),
            db: admin_db,
            doctors: DoctorService::from_pool(doctors_db),
            lifecycle: ReservationLifecycleService::new(),
            notifier: None,
        }
    }

    /// Doctors are told about new reservations through `notifier`.
    pub fn with_notifier(mut self, notifier: WhatsAppNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[instrument(skip(self, request), fields(doctor_id = request.doctor_id))]
    pub async fn create(
        &self,
        request: CreateReservationRequest,
        today: NaiveDate,
    ) -> Result<Reservation, ReservationError> {
        let request = validate_request(request, today)?;

        let doctor = self.doctors.get_doctor(request.doctor_id).await?;
        if !doctor.is_affiliated() {
            warn!("Reservation attempted for unaffiliated doctor {}", doctor.id);
            return Err(ReservationError::DoctorNotAffiliated(doctor.id));
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO reservations (
                doctor_id, query_id, patient_name, patient_phone, preferred_date,
                preferred_time, notes, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.doctor_id)
        .bind(request.query_id)
        .bind(&request.patient_name)
        .bind(&request.patient_phone)
        .bind(request.preferred_date)
        .bind(&request.preferred_time)
        .bind(&request.notes)
        .bind(ReservationStatus::Pending)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        let reservation = self.get(result.last_insert_rowid()).await?;
        info!("Reservation {} created for doctor {}", reservation.id, reservation.doctor_id);

        if let Some(notifier) = &self.notifier {
            match doctor.whatsapp_number.as_deref() {
                Some(number) => {
                    let message = templates::new_reservation(
                        reservation.id,
                        &reservation.patient_name,
                        &reservation.patient_phone,
                        &reservation.preferred_date.to_string(),
                        reservation.preferred_time.as_deref(),
                        reservation.notes.as_deref(),
                    );
                    notifier.notify(Some(number), message);
                }
                None => warn!("Doctor {} has no WhatsApp number, reservation {} not forwarded", doctor.id, reservation.id),
            }
        }

        self.analytics.record_detached(
            event_types::RESERVATION_CREATED,
            json!({
                "reservation_id": reservation.id,
                "doctor_id": reservation.doctor_id,
                "query_id": reservation.query_id,
            }),
        );

        Ok(reservation)
    }

    pub async fn get(&self, reservation_id: i64) -> Result<Reservation, ReservationError> {
        sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservations WHERE id = ?",
            RESERVATION_COLUMNS
        ))
        .bind(reservation_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(ReservationError::NotFound(reservation_id))
    }

    /// Newest first, optionally filtered by status and doctor.
    pub async fn list(&self, query: &ReservationListQuery) -> Result<Page<Reservation>, ReservationError> {
        debug!("Listing reservations with {:?}", query);

        let params = PageParams {
            page: query.page,
            per_page: query.per_page,
        };

        let mut count_builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM reservations WHERE 1 = 1");
        push_filters(&mut count_builder, query);
        let total: i64 = count_builder.build_query_scalar().fetch_one(&self.db).await?;

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM reservations WHERE 1 = 1", RESERVATION_COLUMNS));
        push_filters(&mut builder, query);
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(params.per_page());
        builder.push(" OFFSET ");
        builder.push_bind(params.offset());

        let reservations = builder.build_query_as::<Reservation>().fetch_all(&self.db).await?;
        Ok(Page::new(reservations, total, &params))
    }

    pub async fn list_for_doctor(
        &self,
        doctor_id: i64,
        query: &ReservationListQuery,
    ) -> Result<Page<Reservation>, ReservationError> {
        let scoped = ReservationListQuery {
            doctor_id: Some(doctor_id),
            ..query.clone()
        };
        self.list(&scoped).await
    }

    /// Move a reservation along its lifecycle. With `owner` set, only that
    /// doctor's reservations are visible.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        reservation_id: i64,
        new_status: ReservationStatus,
        owner: Option<i64>,
    ) -> Result<Reservation, ReservationError> {
        let reservation = self.get(reservation_id).await?;
        if owner.is_some_and(|doctor_id| doctor_id != reservation.doctor_id) {
            warn!("Doctor {:?} tried to update reservation {} of another doctor", owner, reservation_id);
            return Err(ReservationError::NotFound(reservation_id));
        }

        self.lifecycle.validate_status_transition(reservation.status, new_status)?;

        // Guard on the old status so a concurrent update cannot be overwritten.
        let result = sqlx::query("UPDATE reservations SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(new_status)
            .bind(Utc::now())
            .bind(reservation_id)
            .bind(reservation.status)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            let current = self.get(reservation_id).await?;
            return Err(ReservationError::InvalidStatusTransition {
                from: current.status,
                to: new_status,
            });
        }

        info!("Reservation {} moved from {} to {}", reservation_id, reservation.status, new_status);
        self.get(reservation_id).await
    }

    /// Pending reservations dated before `today` become `expired`.
    pub async fn expire_stale(&self, today: NaiveDate) -> Result<u64, ReservationError> {
        let result = sqlx::query(
            "UPDATE reservations SET status = ?, updated_at = ? WHERE status = ? AND preferred_date < ?",
        )
        .bind(ReservationStatus::Expired)
        .bind(Utc::now())
        .bind(ReservationStatus::Pending)
        .bind(today)
        .execute(&self.db)
        .await?;

        let expired = result.rows_affected();
        if expired > 0 {
            info!("Expired {} stale reservations", expired);
        }
        Ok(expired)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &ReservationListQuery) {
    if let Some(status) = query.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    if let Some(doctor_id) = query.doctor_id {
        builder.push(" AND doctor_id = ");
        builder.push_bind(doctor_id);
    }
}
