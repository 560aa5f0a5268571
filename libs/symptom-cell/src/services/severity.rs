//! Red-flag screening of the symptom text.
//!
//! Runs before and independently of the LLM so an emergency notice is shown
//! even when the AI provider is down.

use doctor_cell::services::specialties::contains_term;

use crate::models::{EmergencyNotice, Severity};

/// Each entry is a label and the spellings that trigger it.
const RED_FLAGS: &[(&str, &[&str])] = &[
    ("chest pain", &["chest pain", "chest tightness", "胸口痛", "胸痛", "心口痛", "胸口翳"]),
    ("difficulty breathing", &["difficulty breathing", "shortness of breath", "can't breathe", "cannot breathe", "呼吸困難", "透唔到氣", "氣促"]),
    ("stroke", &["stroke", "face drooping", "slurred speech", "中風", "口齒不清", "半身麻痺"]),
    ("unconscious", &["unconscious", "passed out", "fainted", "unresponsive", "昏迷", "暈倒", "失去知覺"]),
    ("severe bleeding", &["severe bleeding", "heavy bleeding", "vomiting blood", "coughing blood", "大量出血", "吐血", "咳血"]),
    ("suicidal", &["suicidal", "suicide", "kill myself", "self-harm", "自殺", "想死", "自殘"]),
    ("seizure", &["seizure", "convulsion", "抽搐", "抽筋不止", "癲癇發作"]),
    ("anaphylaxis", &["anaphylaxis", "throat swelling", "severe allergic", "嚴重過敏", "喉嚨腫"]),
    ("severe head injury", &["head injury", "頭部受傷", "撞到頭"]),
];

/// Labels of every red flag found in `symptoms`, in table order.
pub fn screen(symptoms: &str) -> Vec<String> {
    let haystack = symptoms.to_lowercase();
    RED_FLAGS
        .iter()
        .filter(|(_, terms)| terms.iter().any(|term| contains_term(&haystack, term)))
        .map(|(label, _)| label.to_string())
        .collect()
}

pub fn is_severe(keywords: &[String], severity: Severity) -> bool {
    !keywords.is_empty() || severity == Severity::High
}

pub fn emergency_notice(keywords: Vec<String>, chinese: bool) -> EmergencyNotice {
    let message = if chinese {
        "你的症狀可能屬於緊急情況。請立即致電 999 或前往最近的急症室求診。"
    } else {
        "Your symptoms may indicate a medical emergency. Call 999 or go to the nearest Accident & Emergency (A&E) department now."
    };

    EmergencyNotice {
        keywords,
        message: message.to_string(),
    }
}
