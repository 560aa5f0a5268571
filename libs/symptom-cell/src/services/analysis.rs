use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use doctor_cell::services::specialties::{self, Specialty};

use crate::models::{Analysis, AnalysisError, RecommendedSpecialty, Severity, SymptomRequest};
use crate::services::ai::{ChatMessage, ChatProvider};

static SPECIALTY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s*#>-]*(?:recommended\s+specialt(?:y|ies)|建議專科|推薦專科)[\s*]*[:：][\s*]*(.+)$")
        .expect("valid specialty regex")
});

static SEVERITY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s*#>-]*(?:severity|嚴重程度)[\s*]*[:：][\s*]*(.+)$").expect("valid severity regex")
});

static LIST_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:[,;/、，；]|\band\b|\bor\b|或|及)\s*").expect("valid separator regex"));

const SYSTEM_PROMPT_EN: &str = "You are a medical triage assistant in Hong Kong. You do not diagnose. \
Based on the patient's description, recommend which medical specialty they should see and how urgent it is. \
Reply in exactly this format:\n\
Recommended specialty: <one or two specialties, comma separated, e.g. General Practitioner, Cardiology>\n\
Severity: <low | medium | high>\n\
Analysis: <a short explanation in plain language and advice on next steps>";

const SYSTEM_PROMPT_ZH: &str = "你是香港的醫療分流助理，不作診斷。根據病人描述，建議應該看哪個專科及緊急程度。\
請嚴格按以下格式以繁體中文回覆（專科名稱請同時附上英文）：\n\
Recommended specialty: <一至兩個專科，以逗號分隔，例如 General Practitioner 普通科, Cardiology 心臟科>\n\
Severity: <low | medium | high>\n\
Analysis: <以淺白語言簡短解釋及建議下一步>";

/// Build the chat for one submission.
pub fn build_prompt(request: &SymptomRequest) -> Vec<ChatMessage> {
    let system = if request.wants_chinese() { SYSTEM_PROMPT_ZH } else { SYSTEM_PROMPT_EN };

    let mut details = Vec::new();
    if let Some(age) = request.age {
        details.push(format!("Age: {}", age));
    }
    if let Some(gender) = request.gender.as_deref().filter(|g| !g.trim().is_empty()) {
        details.push(format!("Gender: {}", gender.trim()));
    }
    details.push(format!("Symptoms: {}", request.symptoms.trim()));
    if let Some(chronic) = request.chronic_conditions.as_deref().filter(|c| !c.trim().is_empty()) {
        details.push(format!("Chronic conditions: {}", chronic.trim()));
    }
    if let Some(info) = request.detailed_health_info.as_ref().filter(|v| !v.is_null()) {
        details.push(format!("Additional health information: {}", info));
    }

    vec![ChatMessage::system(system), ChatMessage::user(details.join("\n"))]
}

/// What could be read out of an LLM reply.
#[derive(Debug, PartialEq)]
pub struct ParsedReply {
    pub specialties: Vec<&'static Specialty>,
    pub severity: Option<Severity>,
}

pub fn parse_reply(reply: &str) -> ParsedReply {
    let specialties = SPECIALTY_LINE
        .captures_iter(reply)
        .filter_map(|caps| caps.get(1))
        .flat_map(|m| {
            LIST_SEPARATORS
                .split(m.as_str())
                .map(|part| part.trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '.' || c == '。'))
                .filter(|part| !part.is_empty())
                .filter_map(specialties::resolve)
                .collect::<Vec<_>>()
        })
        .fold(Vec::<&'static Specialty>::new(), |mut acc, s| {
            if !acc.iter().any(|seen| seen.key == s.key) {
                acc.push(s);
            }
            acc
        });

    let severity = SEVERITY_LINE
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .and_then(|m| Severity::parse(m.as_str()));

    ParsedReply { specialties, severity }
}

fn recommended(specialties: &[&'static Specialty]) -> Vec<RecommendedSpecialty> {
    specialties
        .iter()
        .map(|s| RecommendedSpecialty {
            key: s.key,
            name_en: s.name_en,
            name_zh: s.name_zh,
        })
        .collect()
}

pub struct SymptomAnalyzer {
    provider: Result<Box<dyn ChatProvider>, AnalysisError>,
}

impl SymptomAnalyzer {
    pub fn new(provider: Result<Box<dyn ChatProvider>, AnalysisError>) -> Self {
        Self { provider }
    }

    /// Ask the LLM. Any provider failure degrades to a GP recommendation of
    /// medium severity rather than failing the request.
    pub async fn analyze(&self, request: &SymptomRequest) -> Analysis {
        let provider = match &self.provider {
            Ok(provider) => provider,
            Err(e) => {
                warn!("Symptom analysis unavailable: {}", e);
                return Self::degraded("unavailable".to_string(), request);
            }
        };

        match provider.chat(&build_prompt(request)).await {
            Ok(reply) => {
                let parsed = parse_reply(&reply);
                debug!(
                    "{} recommended {} specialties, severity {:?}",
                    provider.name(),
                    parsed.specialties.len(),
                    parsed.severity
                );

                let specialties = if parsed.specialties.is_empty() {
                    vec![specialties::general_practice()]
                } else {
                    parsed.specialties
                };

                Analysis {
                    specialties: recommended(&specialties),
                    severity: parsed.severity.unwrap_or(Severity::Medium),
                    summary: reply,
                    provider: provider.name().to_string(),
                    degraded: false,
                }
            }
            Err(e) => {
                warn!("{} analysis failed, recommending GP: {}", provider.name(), e);
                Self::degraded(provider.name().to_string(), request)
            }
        }
    }

    fn degraded(provider: String, request: &SymptomRequest) -> Analysis {
        let summary = if request.wants_chinese() {
            "暫時未能進行人工智能分析。建議先諮詢普通科醫生。"
        } else {
            "AI analysis is temporarily unavailable. We suggest seeing a General Practitioner first."
        };

        Analysis {
            specialties: recommended(&[specialties::general_practice()]),
            severity: Severity::Medium,
            summary: summary.to_string(),
            provider,
            degraded: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct CannedProvider(Result<String, String>);

    #[async_trait]
    impl ChatProvider for CannedProvider {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn model(&self) -> &str {
            "canned-1"
        }

        async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, AnalysisError> {
            self.0.clone().map_err(AnalysisError::Provider)
        }
    }

    fn request(symptoms: &str) -> SymptomRequest {
        SymptomRequest {
            symptoms: symptoms.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn parses_structured_reply() {
        let reply = "**Recommended specialty:** Cardiology, General Practitioner\n**Severity:** High\nAnalysis: see a doctor.";
        let parsed = parse_reply(reply);
        let keys: Vec<_> = parsed.specialties.iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["cardiology", "general_practice"]);
        assert_eq!(parsed.severity, Some(Severity::High));
    }

    #[test]
    fn parses_chinese_labels_and_separators() {
        let reply = "建議專科：皮膚科、內科\n嚴重程度：低";
        let parsed = parse_reply(reply);
        let keys: Vec<_> = parsed.specialties.iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["dermatology", "internal_medicine"]);
        assert_eq!(parsed.severity, Some(Severity::Low));
    }

    #[test]
    fn negated_severity_wording_keeps_leading_label() {
        let reply = "Recommended specialty: General Practitioner\nSeverity: Low (no emergency signs)";
        assert_eq!(parse_reply(reply).severity, Some(Severity::Low));

        let reply = "Recommended specialty: ENT\nSeverity: Medium, not severe";
        assert_eq!(parse_reply(reply).severity, Some(Severity::Medium));
    }

    #[test]
    fn unstructured_reply_yields_nothing() {
        let parsed = parse_reply("I think you should rest.");
        assert!(parsed.specialties.is_empty());
        assert_eq!(parsed.severity, None);
    }

    #[test]
    fn prompt_carries_patient_details() {
        let mut req = request("cough for 3 weeks");
        req.age = Some(67);
        req.chronic_conditions = Some("asthma".to_string());
        req.ui_language = Some("zh-TW".to_string());

        let messages = build_prompt(&req);
        assert_eq!(messages[0].content, SYSTEM_PROMPT_ZH);
        assert!(messages[1].content.contains("Age: 67"));
        assert!(messages[1].content.contains("Chronic conditions: asthma"));
    }

    #[tokio::test]
    async fn unknown_specialty_falls_back_to_gp() {
        let analyzer = SymptomAnalyzer::new(Ok(Box::new(CannedProvider(Ok(
            "Recommended specialty: Astrology\nSeverity: low".to_string(),
        )))));

        let analysis = analyzer.analyze(&request("tired")).await;
        assert_eq!(analysis.specialties[0].key, "general_practice");
        assert_eq!(analysis.severity, Severity::Low);
        assert!(!analysis.degraded);
    }

    #[tokio::test]
    async fn provider_failure_degrades() {
        let analyzer = SymptomAnalyzer::new(Ok(Box::new(CannedProvider(Err("timeout".to_string())))));

        let analysis = analyzer.analyze(&request("tired")).await;
        assert!(analysis.degraded);
        assert_eq!(analysis.provider, "canned");
        assert_eq!(analysis.specialties[0].key, "general_practice");
    }
}
