use serde_json::json;
use tracing::{info, instrument, warn};

use doctor_cell::models::MatchCriteria;
use doctor_cell::services::{specialties, DoctorMatchingService};
use monitoring_cell::{event_types, AnalyticsService};
use notification_cell::services::templates;
use notification_cell::WhatsAppNotifier;
use shared_database::AppState;

use crate::models::{AnalysisError, FindDoctorResponse, NewUserQuery, SymptomRequest};
use crate::services::ai::provider_for;
use crate::services::analysis::SymptomAnalyzer;
use crate::services::pubmed::{self, PubMedClient};
use crate::services::queries::QueryService;
use crate::services::severity;

/// The `/find_doctor` flow: screen, analyse, look up references, match
/// doctors, store the query and raise alerts.
pub struct DoctorFinder<'a> {
    state: &'a AppState,
}

impl<'a> DoctorFinder<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    #[instrument(skip(self, request), fields(age = ?request.age))]
    pub async fn find(&self, request: SymptomRequest) -> Result<FindDoctorResponse, AnalysisError> {
        request.validate()?;

        let keywords = severity::screen(&request.symptoms);
        if !keywords.is_empty() {
            warn!("Red-flag symptoms reported: {:?}", keywords);
        }

        let analysis = SymptomAnalyzer::new(provider_for(self.state).await)
            .analyze(&request)
            .await;

        let top_specialty = analysis.specialties.first().map(|s| s.name_en).unwrap_or_default();
        let references = PubMedClient::from_state(self.state)
            .references(
                &pubmed::search_term(top_specialty, &request.symptoms),
                pubmed::DEFAULT_MAX_RESULTS,
            )
            .await;

        let criteria = MatchCriteria {
            specialties: analysis.specialties.iter().filter_map(|s| specialties::by_key(s.key)).collect(),
            language: request.language.clone().filter(|l| !l.trim().is_empty()),
            location: request.location.clone(),
            ..Default::default()
        };
        let doctors = DoctorMatchingService::new(self.state)
            .find_matching_doctors(&criteria)
            .await?;

        let specialty_names: Vec<&str> = analysis.specialties.iter().map(|s| s.name_en).collect();

        let query_service = QueryService::new(self.state);
        let query_id = query_service
            .save(NewUserQuery {
                age: request.age,
                gender: request.gender.clone(),
                symptoms: request.symptoms.trim().to_string(),
                chronic_conditions: request.chronic_conditions.clone(),
                language: request.language.clone(),
                location: serde_json::to_string(&request.location).ok(),
                detailed_health_info: request.detailed_health_info.as_ref().map(|v| v.to_string()),
                ai_provider: Some(analysis.provider.clone()),
                ai_response: Some(analysis.summary.clone()),
                recommended_specialties: serde_json::to_string(&specialty_names).ok(),
                severity: Some(analysis.severity.to_string()),
                matched_doctors: serde_json::to_string(&doctors).ok(),
                pubmed_references: serde_json::to_string(&references).ok(),
            })
            .await?;

        let analytics = AnalyticsService::new(self.state);
        analytics.record_detached(
            event_types::DOCTOR_SEARCH,
            json!({
                "query_id": query_id,
                "specialties": specialty_names,
                "severity": analysis.severity,
                "results": doctors.len(),
                "degraded": analysis.degraded,
            }),
        );

        let emergency = if severity::is_severe(&keywords, analysis.severity) {
            query_service
                .record_severe_case(
                    query_id,
                    request.age,
                    request.gender.as_deref(),
                    &request.symptoms,
                    &keywords,
                )
                .await?;

            WhatsAppNotifier::from_state(self.state).await.notify(
                None,
                templates::severe_case_alert(query_id, request.age, request.gender.as_deref(), &request.symptoms, &keywords),
            );
            analytics.record_detached(event_types::SEVERE_CASE, json!({ "query_id": query_id, "keywords": keywords }));

            Some(severity::emergency_notice(keywords, request.wants_chinese()))
        } else {
            None
        };

        info!(
            "Query {} answered: {} doctors, {} references, severity {}",
            query_id,
            doctors.len(),
            references.len(),
            analysis.severity
        );

        Ok(FindDoctorResponse {
            query_id,
            analysis,
            doctors,
            references,
            emergency,
        })
    }
}
