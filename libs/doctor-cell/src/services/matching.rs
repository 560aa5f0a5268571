// libs/doctor-cell/src/services/matching.rs
use std::collections::HashSet;

use sqlx::SqlitePool;
use tracing::{debug, info};

use shared_database::AppState;

use crate::models::{Doctor, DoctorError, DoctorMatch, LocationTier, MatchCriteria};
use crate::services::doctor::DoctorService;
use crate::services::locations::LocationMatcher;
use crate::services::specialties::{contains_term, is_general_practice};

pub const SPECIALTY_POINTS: i64 = 25;
pub const LANGUAGE_POINTS: i64 = 30;
pub const PRIORITY_MULTIPLIER: i64 = 10;

pub const DEFAULT_MAX_RESULTS: usize = 20;
/// Below this many primary matches the list is topped up with GPs/internists.
pub const FALLBACK_THRESHOLD: usize = 5;
/// Size the fallback tops the list up to.
pub const FALLBACK_TARGET: usize = 10;

/// Spellings of each consultation language as they appear in listings.
const LANGUAGE_GROUPS: &[&[&str]] = &[
    &["english", "英語", "英文"],
    &["cantonese", "廣東話", "粵語", "廣州話"],
    &["mandarin", "putonghua", "普通話", "國語"],
    &["chiu chow", "teochew", "潮州話"],
    &["hakka", "客家話"],
    &["shanghainese", "上海話"],
    &["hokkien", "福建話"],
    &["japanese", "日語", "日文"],
    &["korean", "韓語"],
    &["french", "法語"],
    &["german", "德語"],
    &["spanish", "西班牙語"],
    &["tagalog", "filipino", "菲律賓語"],
    &["hindi", "印地語"],
];

/// The preferred language plus its other spellings, lowercased.
pub fn language_terms(language: Option<&str>) -> Vec<String> {
    let Some(language) = language.map(str::trim).filter(|l| !l.is_empty()) else {
        return Vec::new();
    };
    let needle = language.to_lowercase();

    LANGUAGE_GROUPS
        .iter()
        .find(|group| group.iter().any(|spelling| *spelling == needle))
        .map(|group| group.iter().map(|s| s.to_string()).collect())
        .unwrap_or_else(|| vec![needle])
}

fn score_doctor(
    doctor: &Doctor,
    criteria: &MatchCriteria,
    locations: &LocationMatcher,
    languages: &[String],
) -> DoctorMatch {
    let specialty_text = doctor.specialty_text();
    let specialty_matched = criteria.specialties.iter().any(|s| s.found_in(&specialty_text));

    let language_text = doctor.language_text().to_lowercase();
    let language_matched = languages.iter().any(|term| contains_term(&language_text, term));

    let location_tier = locations.tier(&doctor.location_text());

    let mut score = 0;
    if specialty_matched {
        score += SPECIALTY_POINTS;
    }
    if language_matched {
        score += LANGUAGE_POINTS;
    }
    score += location_tier.points();
    score += doctor.priority_flag * PRIORITY_MULTIPLIER;

    DoctorMatch {
        doctor: doctor.clone(),
        score,
        location_tier,
        specialty_matched,
        language_matched,
        is_fallback: false,
    }
}

/// Location tier first, then score, both descending. `sort_by` is stable so
/// ties keep directory order.
fn sort_matches(matches: &mut [DoctorMatch]) {
    matches.sort_by(|a, b| {
        b.location_tier
            .cmp(&a.location_tier)
            .then_with(|| b.score.cmp(&a.score))
    });
}

/// Rank `doctors` for a patient.
///
/// Doctors matching one of the recommended specialties are scored and
/// sorted; with no recommendation every doctor is a candidate. When fewer
/// than [`FALLBACK_THRESHOLD`] candidates remain, GPs and internists from the
/// patient's region are appended (marked `is_fallback`) until the list holds
/// [`FALLBACK_TARGET`] entries.
pub fn filter_doctors(doctors: &[Doctor], criteria: &MatchCriteria) -> Vec<DoctorMatch> {
    let locations = LocationMatcher::new(&criteria.location);
    let languages = language_terms(criteria.language.as_deref());

    let mut primary: Vec<DoctorMatch> = doctors
        .iter()
        .map(|d| score_doctor(d, criteria, &locations, &languages))
        .filter(|m| criteria.specialties.is_empty() || m.specialty_matched)
        .collect();

    sort_matches(&mut primary);
    primary.truncate(criteria.max_results);

    if primary.len() < FALLBACK_THRESHOLD {
        let primary_ids: HashSet<i64> = primary.iter().map(|m| m.doctor.id).collect();
        let mut fallback: Vec<DoctorMatch> = doctors
            .iter()
            .filter(|d| !primary_ids.contains(&d.id))
            .filter(|d| is_general_practice(&d.specialty_text()))
            .map(|d| score_doctor(d, criteria, &locations, &languages))
            .filter(|m| !locations.has_location() || m.location_tier >= LocationTier::Region)
            .map(|mut m| {
                m.is_fallback = true;
                m
            })
            .collect();

        sort_matches(&mut fallback);

        let room = FALLBACK_TARGET.saturating_sub(primary.len());
        debug!(
            "Only {} primary matches, adding up to {} fallback doctors from {} candidates",
            primary.len(),
            room,
            fallback.len()
        );
        primary.extend(fallback.into_iter().take(room));
    }

    primary
}

pub struct DoctorMatchingService {
    doctor_service: DoctorService,
}

impl DoctorMatchingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            doctor_service: DoctorService::new(state),
        }
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            doctor_service: DoctorService::from_pool(pool),
        }
    }

    /// Load the whole directory and rank it for `criteria`.
    pub async fn find_matching_doctors(&self, criteria: &MatchCriteria) -> Result<Vec<DoctorMatch>, DoctorError> {
        let doctors = self.doctor_service.list_all().await?;
        let matches = filter_doctors(&doctors, criteria);

        info!(
            "Matched {} of {} doctors ({} fallback)",
            matches.len(),
            doctors.len(),
            matches.iter().filter(|m| m.is_fallback).count()
        );

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::AffiliationStatus;
    use crate::services::locations::LocationSelection;
    use crate::services::specialties::by_key;

    fn doctor(id: i64, specialty: &str, languages: &str, address: &str, priority: i64) -> Doctor {
        Doctor {
            id,
            name_en: Some(format!("Dr {}", id)),
            name_zh: None,
            specialty_en: Some(specialty.to_string()),
            specialty_zh: None,
            qualifications_en: None,
            qualifications_zh: None,
            languages_en: Some(languages.to_string()),
            languages_zh: None,
            phone: None,
            email: None,
            website: None,
            address_en: Some(address.to_string()),
            address_zh: None,
            district: None,
            priority_flag: priority,
            affiliation_status: AffiliationStatus::Unaffiliated,
            whatsapp_number: None,
            affiliated_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn criteria(specialty: &str, language: Option<&str>, area: Option<&str>) -> MatchCriteria {
        MatchCriteria {
            specialties: vec![by_key(specialty).unwrap()],
            language: language.map(str::to_string),
            location: LocationSelection {
                area: area.map(str::to_string),
                ..Default::default()
            },
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    #[test]
    fn scores_are_additive() {
        let doctors = vec![doctor(1, "Cardiology", "English, Cantonese", "Nathan Road, Mong Kok", 2)];
        let matches = filter_doctors(&doctors, &criteria("cardiology", Some("Cantonese"), Some("Mong Kok")));

        let m = &matches[0];
        assert!(m.specialty_matched && m.language_matched);
        assert_eq!(m.location_tier, LocationTier::Area);
        assert_eq!(m.score, 25 + 30 + 60 + 20);
    }

    #[test]
    fn language_aliases_match_chinese_listings() {
        let mut d = doctor(1, "Cardiology", "", "", 0);
        d.languages_zh = Some("廣東話、普通話".to_string());
        let matches = filter_doctors(&[d], &criteria("cardiology", Some("cantonese"), None));
        assert!(matches[0].language_matched);
        assert_eq!(matches[0].score, 55);
    }

    #[test]
    fn tier_outranks_score() {
        let doctors = vec![
            doctor(1, "Cardiology", "English", "Kwun Tong", 5),
            doctor(2, "Cardiology", "", "Jordan", 0),
            doctor(3, "Cardiology", "", "Mong Kok", 0),
        ];
        let matches = filter_doctors(&doctors, &criteria("cardiology", Some("English"), Some("Mong Kok")));
        let ids: Vec<i64> = matches.iter().map(|m| m.doctor.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn ties_keep_directory_order() {
        let doctors = vec![
            doctor(7, "Cardiology", "", "", 0),
            doctor(3, "Cardiology", "", "", 0),
            doctor(5, "Cardiology", "", "", 0),
        ];
        let matches = filter_doctors(&doctors, &criteria("cardiology", None, None));
        let ids: Vec<i64> = matches.iter().map(|m| m.doctor.id).collect();
        assert_eq!(ids[..3], [7, 3, 5]);
    }

    #[test]
    fn thin_results_fall_back_to_regional_gps() {
        let doctors = vec![
            doctor(1, "Neurology", "", "Mong Kok", 0),
            doctor(2, "General Practitioner", "", "Sham Shui Po", 0),
            doctor(3, "Internal Medicine", "", "Tsim Sha Tsui", 0),
            doctor(4, "Family Medicine", "", "Causeway Bay", 0),
            doctor(5, "Dermatology", "", "Mong Kok", 0),
        ];
        let matches = filter_doctors(&doctors, &criteria("neurology", None, Some("Mong Kok")));
        let ids: Vec<i64> = matches.iter().map(|m| m.doctor.id).collect();

        // The Kowloon GPs are added, the Hong Kong Island one is not.
        assert_eq!(ids, vec![1, 3, 2]);
        assert!(!matches[0].is_fallback);
        assert!(matches[1..].iter().all(|m| m.is_fallback));
    }

    #[test]
    fn fallback_never_duplicates_primary_matches() {
        let doctors: Vec<Doctor> = (1..=3)
            .map(|id| doctor(id, "General Practitioner", "", "", 0))
            .collect();
        let matches = filter_doctors(&doctors, &criteria("general_practice", None, None));
        assert_eq!(matches.len(), 3);
        assert!(matches.iter().all(|m| !m.is_fallback));
    }

    #[test]
    fn fallback_stops_at_target() {
        let doctors: Vec<Doctor> = (1..=30)
            .map(|id| doctor(id, "General Practitioner", "", "", 0))
            .chain(std::iter::once(doctor(99, "Urology", "", "", 0)))
            .collect();
        let matches = filter_doctors(&doctors, &criteria("urology", None, None));
        assert_eq!(matches.len(), FALLBACK_TARGET);
        assert_eq!(matches[0].doctor.id, 99);
    }

    #[test]
    fn no_fallback_when_primary_is_large_enough() {
        let doctors: Vec<Doctor> = (1..=6)
            .map(|id| doctor(id, "Cardiology", "", "", 0))
            .chain(std::iter::once(doctor(50, "General Practitioner", "", "", 0)))
            .collect();
        let matches = filter_doctors(&doctors, &criteria("cardiology", None, None));
        assert_eq!(matches.len(), 6);
    }

    #[test]
    fn empty_directory_yields_nothing() {
        assert!(filter_doctors(&[], &criteria("cardiology", None, None)).is_empty());
    }

    #[test]
    fn no_specialty_means_every_doctor_is_a_candidate() {
        let doctors = vec![doctor(1, "Urology", "", "", 1), doctor(2, "Psychiatry", "", "", 3)];
        let matches = filter_doctors(&doctors, &MatchCriteria::default());
        let ids: Vec<i64> = matches.iter().map(|m| m.doctor.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn truncates_to_max_results() {
        let doctors: Vec<Doctor> = (1..=40).map(|id| doctor(id, "Cardiology", "", "", 0)).collect();
        let mut c = criteria("cardiology", None, None);
        c.max_results = 8;
        assert_eq!(filter_doctors(&doctors, &c).len(), 8);
    }
}
