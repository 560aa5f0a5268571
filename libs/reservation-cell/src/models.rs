use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

use doctor_cell::models::DoctorError;
use shared_models::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
    Expired,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
            ReservationStatus::NoShow => "no_show",
            ReservationStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: i64,
    pub doctor_id: i64,
    pub query_id: Option<i64>,
    pub patient_name: String,
    pub patient_phone: String,
    pub preferred_date: NaiveDate,
    pub preferred_time: Option<String>,
    pub notes: Option<String>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReservationRequest {
    pub doctor_id: i64,
    pub query_id: Option<i64>,
    pub patient_name: String,
    pub patient_phone: String,
    pub preferred_date: NaiveDate,
    pub preferred_time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationListQuery {
    pub status: Option<ReservationStatus>,
    pub doctor_id: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Error, Debug)]
pub enum ReservationError {
    #[error("Reservation {0} not found")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Doctor {0} does not accept reservations")]
    DoctorNotAffiliated(i64),

    #[error("Reservation cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::NotFound(_) => AppError::NotFound(err.to_string()),
            ReservationError::Validation(msg) => AppError::ValidationError(msg),
            ReservationError::DoctorNotAffiliated(_) => AppError::BadRequest(err.to_string()),
            ReservationError::InvalidStatusTransition { .. } => AppError::Conflict(err.to_string()),
            ReservationError::Doctor(e) => e.into(),
            ReservationError::Database(e) => AppError::from(e),
        }
    }
}
