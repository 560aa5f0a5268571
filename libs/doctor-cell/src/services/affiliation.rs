use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use shared_database::AppState;

use crate::models::{AffiliationStatus, Doctor, DoctorError};
use crate::services::doctor::DoctorService;

pub struct AffiliationService {
    db: SqlitePool,
    doctor_service: DoctorService,
}

fn clean_number(number: Option<String>) -> Option<String> {
    number
        .map(|n| n.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect::<String>())
        .filter(|n| !n.is_empty())
}

impl AffiliationService {
    pub fn new(state: &AppState) -> Self {
        Self::from_pool(state.doctors_db.pool().clone())
    }

    pub fn from_pool(db: SqlitePool) -> Self {
        Self {
            doctor_service: DoctorService::from_pool(db.clone()),
            db,
        }
    }

    /// Admin-driven status change.
    pub async fn set_status(
        &self,
        doctor_id: i64,
        status: AffiliationStatus,
        whatsapp_number: Option<String>,
    ) -> Result<Doctor, DoctorError> {
        let doctor = self.doctor_service.get_doctor(doctor_id).await?;
        let current = doctor.affiliation_status;

        if !current.can_transition_to(status) {
            warn!("Rejected affiliation change for doctor {}: {} -> {}", doctor_id, current, status);
            return Err(DoctorError::InvalidAffiliationTransition { from: current, to: status });
        }

        let number = clean_number(whatsapp_number).or(doctor.whatsapp_number.clone());
        if status == AffiliationStatus::Affiliated && number.is_none() {
            return Err(DoctorError::Validation(
                "A WhatsApp number is required to affiliate a doctor".to_string(),
            ));
        }

        let affiliated_at = match status {
            AffiliationStatus::Affiliated => Some(Utc::now()),
            AffiliationStatus::Suspended => doctor.affiliated_at,
            _ => None,
        };

        sqlx::query(
            "UPDATE doctors SET affiliation_status = ?, whatsapp_number = ?, affiliated_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status)
        .bind(number)
        .bind(affiliated_at)
        .bind(Utc::now())
        .bind(doctor_id)
        .execute(&self.db)
        .await?;

        info!("Doctor {} affiliation changed: {} -> {}", doctor_id, current, status);
        self.doctor_service.get_doctor(doctor_id).await
    }

    /// A doctor asks to join; only unaffiliated doctors can apply.
    pub async fn apply(&self, doctor_id: i64, whatsapp_number: Option<String>) -> Result<Doctor, DoctorError> {
        let doctor = self.doctor_service.get_doctor(doctor_id).await?;
        if doctor.affiliation_status != AffiliationStatus::Unaffiliated {
            return Err(DoctorError::InvalidAffiliationTransition {
                from: doctor.affiliation_status,
                to: AffiliationStatus::Pending,
            });
        }
        self.set_status(doctor_id, AffiliationStatus::Pending, whatsapp_number).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_formatting_from_numbers() {
        assert_eq!(clean_number(Some("+852 9123-4567".to_string())).as_deref(), Some("+85291234567"));
        assert_eq!(clean_number(Some(" - ".to_string())), None);
        assert_eq!(clean_number(None), None);
    }
}
