use std::sync::LazyLock;

use chrono::{FixedOffset, NaiveDate, Utc};
use regex::Regex;

use crate::models::{CreateReservationRequest, ReservationError};

/// Hong Kong numbers: 8 digits starting 2-9, optionally prefixed by 852.
static HK_PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:852)?([2-9]\d{7})$").expect("valid phone regex"));

static TIME_OF_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[01]\d|2[0-3]):[0-5]\d$").expect("valid time regex"));

const MAX_NAME_CHARS: usize = 100;
const MAX_NOTES_CHARS: usize = 1000;
const HK_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Today's date in Hong Kong.
pub fn hk_today() -> NaiveDate {
    match FixedOffset::east_opt(HK_UTC_OFFSET_SECS) {
        Some(offset) => Utc::now().with_timezone(&offset).date_naive(),
        None => Utc::now().date_naive(),
    }
}

/// Strip formatting and the country code, returning the 8 local digits.
pub fn normalize_hk_phone(raw: &str) -> Result<String, ReservationError> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '+'))
        .collect();

    HK_PHONE
        .captures(&digits)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ReservationError::Validation("patient_phone must be a Hong Kong phone number".to_string()))
}

/// Validate and clean a reservation request against `today`.
pub fn validate_request(
    mut request: CreateReservationRequest,
    today: NaiveDate,
) -> Result<CreateReservationRequest, ReservationError> {
    request.patient_name = request.patient_name.trim().to_string();
    if request.patient_name.is_empty() {
        return Err(ReservationError::Validation("patient_name is required".to_string()));
    }
    if request.patient_name.chars().count() > MAX_NAME_CHARS {
        return Err(ReservationError::Validation("patient_name is too long".to_string()));
    }

    request.patient_phone = normalize_hk_phone(&request.patient_phone)?;

    if request.preferred_date < today {
        return Err(ReservationError::Validation("preferred_date cannot be in the past".to_string()));
    }

    request.preferred_time = request.preferred_time.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    if let Some(time) = &request.preferred_time {
        if !TIME_OF_DAY.is_match(time) {
            return Err(ReservationError::Validation("preferred_time must be HH:MM".to_string()));
        }
    }

    request.notes = request.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    if request.notes.as_deref().is_some_and(|n| n.chars().count() > MAX_NOTES_CHARS) {
        return Err(ReservationError::Validation("notes are too long".to_string()));
    }

    Ok(request)
}
