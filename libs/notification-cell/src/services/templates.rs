//! Message bodies sent over WhatsApp.

pub fn severe_case_alert(query_id: i64, age: Option<i64>, gender: Option<&str>, symptoms: &str, keywords: &[String]) -> String {
    let age = age.map(|a| a.to_string()).unwrap_or_else(|| "?".to_string());
    let gender = gender.filter(|g| !g.is_empty()).unwrap_or("?");
    let keywords = if keywords.is_empty() {
        "AI assessment".to_string()
    } else {
        keywords.join(", ")
    };

    format!(
        "🚨 Severe case reported (query #{})\nAge: {}  Gender: {}\nFlags: {}\nSymptoms: {}",
        query_id,
        age,
        gender,
        keywords,
        truncate(symptoms, 500)
    )
}

pub fn new_reservation(
    reservation_id: i64,
    patient_name: &str,
    patient_phone: &str,
    date: &str,
    time: Option<&str>,
    notes: Option<&str>,
) -> String {
    let mut message = format!(
        "📅 New reservation #{}\nPatient: {}\nPhone: {}\nDate: {} {}",
        reservation_id,
        patient_name,
        patient_phone,
        date,
        time.unwrap_or("")
    );
    if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
        message.push_str("\nNotes: ");
        message.push_str(truncate(notes, 300));
    }
    message.trim_end().to_string()
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severe_alert_lists_keywords() {
        let message = severe_case_alert(7, Some(60), Some("male"), "chest pain", &["chest pain".to_string()]);
        assert!(message.contains("query #7"));
        assert!(message.contains("Flags: chest pain"));

        let message = severe_case_alert(8, None, None, "x", &[]);
        assert!(message.contains("Age: ?"));
        assert!(message.contains("AI assessment"));
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("胸口痛好耐", 3), "胸口痛");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn reservation_notes_are_optional() {
        let message = new_reservation(1, "Chan Tai Man", "91234567", "2030-01-02", Some("10:30"), None);
        assert!(!message.contains("Notes"));
        let message = new_reservation(1, "Chan Tai Man", "91234567", "2030-01-02", None, Some("first visit"));
        assert!(message.ends_with("Notes: first visit"));
    }
}
